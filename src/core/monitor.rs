//! The per-sample processing engine.
//!
//! [`ProctorEngine`] owns the calibrated baseline, all detector state, the
//! aggregator and the session aggregate, and advances them one sample at a
//! time. It is a pure state transition over sample timestamps: nothing in
//! here reads the wall clock, blocks, or performs I/O, which is what makes
//! the scenario tests deterministic.

use crate::config::Thresholds;
use crate::core::calibration::Baseline;
use crate::core::detectors::{
    head_turned, BlinkDetector, GazeDetector, GazeDirection, NoiseDetector, PresenceDetector,
    TalkingDetector,
};
use crate::core::session::{Aggregator, AlertSink, SessionState, ViolationKind};
use crate::core::signals;
use crate::source::types::Sample;
use chrono::{DateTime, Utc};

/// Live status emitted once per processed sample, for display collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleStatus {
    pub gaze: GazeDirection,
    pub face_count: usize,
    pub risk_score: u32,
    pub total_blinks: u32,
    pub total_violations: usize,
}

/// Violation-detection and risk-scoring engine for one session.
pub struct ProctorEngine {
    thresholds: Thresholds,
    baseline: Baseline,
    blink: BlinkDetector,
    gaze: GazeDetector,
    talking: TalkingDetector,
    presence: PresenceDetector,
    noise: NoiseDetector,
    aggregator: Aggregator,
    session: SessionState,
}

impl ProctorEngine {
    /// Build an engine around a calibrated baseline. The baseline must exist
    /// before any detector runs; the type makes that unrepresentable.
    pub fn new(thresholds: &Thresholds, baseline: Baseline, started_at: DateTime<Utc>) -> Self {
        Self {
            blink: BlinkDetector::new(
                thresholds.eye_closure_threshold,
                thresholds.blink_consecutive_samples,
                thresholds.blink_min_separation_secs,
                thresholds.eyes_closed_secs,
                thresholds.excessive_blink_threshold,
            ),
            gaze: GazeDetector::new(
                thresholds.gaze_x_delta,
                thresholds.gaze_y_delta,
                thresholds.gaze_away_secs,
            ),
            talking: TalkingDetector::new(
                thresholds.mouth_variance_threshold,
                thresholds.talking_secs,
            ),
            presence: PresenceDetector::new(thresholds.no_face_secs),
            noise: NoiseDetector::new(
                thresholds.noise_ratio_threshold,
                thresholds.noise_consecutive_samples,
            ),
            aggregator: Aggregator::new(
                thresholds.violation_cooldown_secs,
                thresholds.alert_cooldown_secs,
            ),
            session: SessionState::new(started_at),
            thresholds: thresholds.clone(),
            baseline,
        }
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Hand the session aggregate to the report builder.
    pub fn into_session(self) -> SessionState {
        self.session
    }

    /// Process one sample, emitting any violations to `sink` and returning
    /// the per-cycle status.
    pub fn process(&mut self, sample: &Sample, sink: &mut dyn AlertSink) -> CycleStatus {
        let now = sample.timestamp;
        self.session.observe(now);

        if sample.faces.len() > 1 {
            self.aggregator
                .emit(&mut self.session, ViolationKind::MultipleFaces, now, sink);
        }

        // Per-face detectors run only against a single confidently tracked
        // face with landmarks. Anything else clears their sustain state so
        // a condition never spans face loss/reacquisition.
        let face = sample
            .sole_face(self.thresholds.face_confidence)
            .filter(|f| !f.landmarks.is_empty());

        let gaze_direction = match face {
            Some(face) => {
                let closure = signals::average_eye_closure(face);
                let blink = self.blink.update(closure, now);
                if blink.blink {
                    self.session.record_blink();
                }
                if blink.eyes_closed {
                    self.aggregator.emit(
                        &mut self.session,
                        ViolationKind::EyesClosedExtended,
                        now,
                        sink,
                    );
                }
                if blink.excessive_blinking {
                    self.aggregator.emit(
                        &mut self.session,
                        ViolationKind::ExcessiveBlinking,
                        now,
                        sink,
                    );
                }

                if self.talking.update(signals::mouth_openness(face), now) {
                    self.aggregator
                        .emit(&mut self.session, ViolationKind::Talking, now, sink);
                }

                if head_turned(
                    signals::head_offset(face),
                    self.thresholds.head_turn_x,
                    self.thresholds.head_turn_y,
                ) {
                    self.aggregator
                        .emit(&mut self.session, ViolationKind::HeadTurned, now, sink);
                }

                let offset =
                    signals::gaze_offset(face, self.baseline.gaze_x, self.baseline.gaze_y);
                let (direction, trigger) = self.gaze.update(offset, now);
                if let Some(kind) = trigger {
                    self.aggregator.emit(&mut self.session, kind, now, sink);
                }

                if self.noise.update(sample.noise_level / self.baseline.noise_floor) {
                    self.aggregator
                        .emit(&mut self.session, ViolationKind::LoudNoise, now, sink);
                }

                direction
            }
            None => {
                self.blink.reset();
                self.gaze.reset();
                self.talking.reset();
                self.noise.reset();
                GazeDirection::NoFace
            }
        };

        // Presence is about faces in frame, tracked or not: a crowd of
        // faces is not an absence.
        let face_present = face.is_some() || !sample.faces.is_empty();
        if self.presence.update(face_present, now) {
            self.aggregator
                .emit(&mut self.session, ViolationKind::FaceLeftFrame, now, sink);
        }

        CycleStatus {
            gaze: gaze_direction,
            face_count: sample.faces.len(),
            risk_score: self.session.risk_score,
            total_blinks: self.session.total_blinks,
            total_violations: self.session.violations().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::NullAlertSink;
    use crate::source::types::{mesh, Face, Landmark};
    use chrono::{Duration, TimeZone};

    fn baseline() -> Baseline {
        Baseline {
            gaze_x: 0.5,
            gaze_y: 0.5,
            noise_floor: 0.01,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    /// A well-behaved face: eyes open, gaze centered, mouth shut, head
    /// straight.
    fn neutral_face() -> Face {
        let mut landmarks = vec![Landmark::new(0.0, 0.0); 478];
        for (eye, cx) in [(&mesh::LEFT_EYE, 0.35), (&mesh::RIGHT_EYE, 0.65)] {
            landmarks[eye[0]] = Landmark::new(cx - 0.04, 0.4);
            landmarks[eye[3]] = Landmark::new(cx + 0.04, 0.4);
            landmarks[eye[1]] = Landmark::new(cx - 0.015, 0.388);
            landmarks[eye[5]] = Landmark::new(cx - 0.015, 0.412);
            landmarks[eye[2]] = Landmark::new(cx + 0.015, 0.388);
            landmarks[eye[4]] = Landmark::new(cx + 0.015, 0.412);
        }
        landmarks[mesh::LEFT_IRIS] = Landmark::new(0.5, 0.5);
        landmarks[mesh::RIGHT_IRIS] = Landmark::new(0.5, 0.5);
        landmarks[mesh::NOSE_TIP] = Landmark::new(0.5, 0.5);
        landmarks[mesh::MOUTH_TOP] = Landmark::new(0.5, 0.6);
        landmarks[mesh::MOUTH_BOTTOM] = Landmark::new(0.5, 0.605);
        Face::new(0.9, landmarks)
    }

    fn engine() -> ProctorEngine {
        ProctorEngine::new(&Thresholds::default(), baseline(), t0())
    }

    #[test]
    fn test_neutral_face_produces_nothing() {
        let mut engine = engine();
        let mut sink = NullAlertSink;

        for i in 0..300 {
            let sample = Sample::new(
                t0() + Duration::milliseconds(i * 100),
                vec![neutral_face()],
                0.01,
            );
            let status = engine.process(&sample, &mut sink);
            assert_eq!(status.gaze, GazeDirection::Center);
            assert_eq!(status.face_count, 1);
        }
        assert_eq!(engine.session().violations().len(), 0);
        assert_eq!(engine.session().risk_score, 0);
    }

    #[test]
    fn test_multiple_faces_emits_high_severity() {
        let mut engine = engine();
        let mut sink = NullAlertSink;

        let sample = Sample::new(t0(), vec![neutral_face(), neutral_face()], 0.01);
        let status = engine.process(&sample, &mut sink);

        assert_eq!(status.face_count, 2);
        assert_eq!(engine.session().counters.multiple_faces, 1);
        assert_eq!(engine.session().risk_score, 10);
        // Multiple untracked faces are not an absence.
        assert_eq!(engine.session().counters.no_face, 0);
    }

    #[test]
    fn test_low_confidence_face_is_treated_as_absent() {
        let mut engine = engine();
        let mut sink = NullAlertSink;

        let mut face = neutral_face();
        face.confidence = 0.2;
        // 6.5s of low-confidence detections at 2 Hz.
        for i in 0..13 {
            let sample = Sample::new(t0() + Duration::milliseconds(i * 500), vec![face.clone()], 0.01);
            let status = engine.process(&sample, &mut sink);
            assert_eq!(status.gaze, GazeDirection::NoFace);
        }
        assert_eq!(engine.session().counters.no_face, 1);
    }

    #[test]
    fn test_face_loss_clears_gaze_sustain() {
        let mut engine = engine();
        let mut sink = NullAlertSink;

        let mut away = neutral_face();
        away.landmarks[mesh::LEFT_IRIS] = Landmark::new(0.62, 0.5);
        away.landmarks[mesh::RIGHT_IRIS] = Landmark::new(0.62, 0.5);

        // 3s looking right, then the face drops out, then 3s more. The two
        // runs must not add up to a sustained deviation.
        for i in 0..30 {
            engine.process(
                &Sample::new(t0() + Duration::milliseconds(i * 100), vec![away.clone()], 0.01),
                &mut sink,
            );
        }
        engine.process(
            &Sample::new(t0() + Duration::milliseconds(3000), Vec::new(), 0.01),
            &mut sink,
        );
        for i in 0..30 {
            engine.process(
                &Sample::new(
                    t0() + Duration::milliseconds(3100 + i * 100),
                    vec![away.clone()],
                    0.01,
                ),
                &mut sink,
            );
        }

        assert_eq!(engine.session().counters.gaze_away, 0);
    }

    #[test]
    fn test_head_turn_rate_limited_by_cooldown() {
        let mut engine = engine();
        let mut sink = NullAlertSink;

        let mut turned = neutral_face();
        turned.landmarks[mesh::NOSE_TIP] = Landmark::new(0.75, 0.5);

        // 12s of continuous head turn at 10 Hz: the instantaneous trigger
        // fires every sample, the cooldown admits one per 5s.
        for i in 0..120 {
            engine.process(
                &Sample::new(t0() + Duration::milliseconds(i * 100), vec![turned.clone()], 0.01),
                &mut sink,
            );
        }

        let head_turns = engine
            .session()
            .violations()
            .iter()
            .filter(|v| v.kind == ViolationKind::HeadTurned)
            .count();
        assert_eq!(head_turns, 3); // t=0, t=5, t=10
    }

    #[test]
    fn test_loud_noise_requires_tracked_face() {
        let mut engine = engine();
        let mut sink = NullAlertSink;

        // A loud empty room: without a tracked face, noise detection is
        // inactive like every other per-face detector.
        for i in 0..30 {
            engine.process(
                &Sample::new(t0() + Duration::milliseconds(i * 100), Vec::new(), 0.2),
                &mut sink,
            );
        }
        assert_eq!(engine.session().violations().len(), 0);

        // Same noise with the candidate in frame: one violation after 30
        // consecutive loud samples.
        for i in 30..60 {
            engine.process(
                &Sample::new(
                    t0() + Duration::milliseconds(i * 100),
                    vec![neutral_face()],
                    0.2,
                ),
                &mut sink,
            );
        }
        let noise = engine
            .session()
            .violations()
            .iter()
            .filter(|v| v.kind == ViolationKind::LoudNoise)
            .count();
        assert_eq!(noise, 1);
    }

    #[test]
    fn test_noise_run_does_not_span_face_loss() {
        let mut engine = engine();
        let mut sink = NullAlertSink;

        // 20 loud samples with a face, one faceless sample, 29 more loud
        // samples: the two runs must not add up to 30.
        for i in 0..20 {
            engine.process(
                &Sample::new(
                    t0() + Duration::milliseconds(i * 100),
                    vec![neutral_face()],
                    0.2,
                ),
                &mut sink,
            );
        }
        engine.process(
            &Sample::new(t0() + Duration::milliseconds(2000), Vec::new(), 0.2),
            &mut sink,
        );
        for i in 0..29 {
            engine.process(
                &Sample::new(
                    t0() + Duration::milliseconds(2100 + i * 100),
                    vec![neutral_face()],
                    0.2,
                ),
                &mut sink,
            );
        }

        assert_eq!(engine.session().counters, Default::default());
        assert_eq!(engine.session().violations().len(), 0);
    }

    #[test]
    fn test_status_reflects_session() {
        let mut engine = engine();
        let mut sink = NullAlertSink;

        let sample = Sample::new(t0(), vec![neutral_face(), neutral_face()], 0.01);
        let status = engine.process(&sample, &mut sink);

        assert_eq!(status.risk_score, engine.session().risk_score);
        assert_eq!(status.total_violations, engine.session().violations().len());
        assert_eq!(status.total_blinks, 0);
    }
}
