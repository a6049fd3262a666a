//! End-to-end scenario tests for the proctoring engine.
//!
//! Each scenario drives the engine with a synthetic sample stream clocked
//! purely by sample timestamps, so every run is deterministic.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use vigil_proctor::config::Thresholds;
use vigil_proctor::core::{
    Baseline, Calibrator, NullAlertSink, ProctorEngine, ViolationKind,
};
use vigil_proctor::report::SessionReport;
use vigil_proctor::source::{mesh, Face, Landmark, ReplaySource, Sample};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// A well-behaved face: eyes open, gaze on the calibrated center, mouth
/// shut, head straight.
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

/// Same face with the eyelids nearly shut (closure ratio ~0.05).
fn closed_eyes_face() -> Face {
    let mut face = neutral_face();
    for eye in [&mesh::LEFT_EYE, &mesh::RIGHT_EYE] {
        for (upper, lower) in [(eye[1], eye[5]), (eye[2], eye[4])] {
            let x = face.landmarks[upper].x;
            face.landmarks[upper] = Landmark::new(x, 0.398);
            face.landmarks[lower] = Landmark::new(x, 0.402);
        }
    }
    face
}

/// Same face with both irises shifted right of the calibrated center.
fn gaze_right_face() -> Face {
    let mut face = neutral_face();
    face.landmarks[mesh::LEFT_IRIS] = Landmark::new(0.62, 0.5);
    face.landmarks[mesh::RIGHT_IRIS] = Landmark::new(0.62, 0.5);
    face
}

fn baseline() -> Baseline {
    Baseline {
        gaze_x: 0.5,
        gaze_y: 0.5,
        noise_floor: 0.01,
    }
}

fn engine() -> ProctorEngine {
    ProctorEngine::new(&Thresholds::default(), baseline(), t0())
}

fn at(ms: i64) -> DateTime<Utc> {
    t0() + Duration::milliseconds(ms)
}

#[test]
fn test_one_blink_per_second_counts_sixty_and_turns_excessive() {
    let mut engine = engine();
    let mut sink = NullAlertSink;

    // 61 seconds at 10 Hz. Each second the eyes close for samples 3 and 4
    // and reopen at sample 5, which registers exactly one blink.
    for i in 0..610 {
        let face = if matches!(i % 10, 3 | 4) {
            closed_eyes_face()
        } else {
            neutral_face()
        };
        engine.process(&Sample::new(at(i * 100), vec![face], 0.01), &mut sink);
    }

    let session = engine.session();
    assert_eq!(session.total_blinks, 61);
    // The rate check arms only once 60 blinks have been seen; from then on
    // 60 blinks inside the trailing minute is well past the threshold.
    assert!(session.counters.excessive_blink >= 1);
    let first = session
        .violations()
        .iter()
        .find(|v| v.kind == ViolationKind::ExcessiveBlinking)
        .unwrap();
    assert_eq!(first.timestamp, at(59_500));
    // A brief closure is never sustained closure.
    assert_eq!(session.counters.eyes_closed, 0);
}

#[test]
fn test_absence_fires_at_six_and_twelve_seconds() {
    let mut engine = engine();
    let mut sink = NullAlertSink;

    // 13 seconds of empty frames at 2 Hz.
    for i in 0..27 {
        engine.process(&Sample::new(at(i * 500), Vec::new(), 0.01), &mut sink);
    }

    let session = engine.session();
    assert_eq!(session.counters.no_face, 2);
    let times: Vec<DateTime<Utc>> = session
        .violations()
        .iter()
        .filter(|v| v.kind == ViolationKind::FaceLeftFrame)
        .map(|v| v.timestamp)
        .collect();
    assert_eq!(times, vec![at(6_000), at(12_000)]);
    // FACE_LEFT_FRAME is high severity.
    assert_eq!(session.risk_score, 20);
}

#[test]
fn test_sustained_gaze_deviation_fires_once_at_four_seconds() {
    let mut engine = engine();
    let mut sink = NullAlertSink;

    // 4.2 seconds looking right at 10 Hz.
    for i in 0..43 {
        engine.process(
            &Sample::new(at(i * 100), vec![gaze_right_face()], 0.01),
            &mut sink,
        );
    }

    let session = engine.session();
    assert_eq!(session.counters.gaze_away, 1);
    let violation = &session.violations()[0];
    assert_eq!(violation.kind, ViolationKind::GazeAwayRight);
    assert_eq!(violation.timestamp, at(4_000));
}

#[test]
fn test_loud_noise_emissions_respect_per_kind_cooldown() {
    let mut engine = engine();
    let mut sink = NullAlertSink;

    // The candidate sits in a constantly loud room for 90 seconds at
    // 10 Hz. The detector triggers every 30 samples; the cooldown thins
    // that to one emission per five seconds at most.
    for i in 0..900 {
        engine.process(
            &Sample::new(at(i * 100), vec![neutral_face()], 0.2),
            &mut sink,
        );
    }

    let noise: Vec<DateTime<Utc>> = engine
        .session()
        .violations()
        .iter()
        .filter(|v| v.kind == ViolationKind::LoudNoise)
        .map(|v| v.timestamp)
        .collect();
    assert!(noise.len() >= 5);
    assert!(noise
        .windows(2)
        .all(|pair| pair[1] - pair[0] >= Duration::seconds(5)));
}

#[test]
fn test_risk_score_equals_sum_of_logged_weights() {
    let mut engine = engine();
    let mut sink = NullAlertSink;

    // A messy session: two faces, then a long stretch with nobody in
    // frame (the room noise during the absence must not register).
    for i in 0..10 {
        engine.process(
            &Sample::new(at(i * 500), vec![neutral_face(), neutral_face()], 0.01),
            &mut sink,
        );
    }
    for i in 10..40 {
        engine.process(&Sample::new(at(i * 500), Vec::new(), 0.2), &mut sink);
    }

    let session = engine.session();
    assert!(!session.violations().is_empty());
    assert!(session
        .violations()
        .iter()
        .all(|v| v.kind != ViolationKind::LoudNoise));
    let weighted: u32 = session
        .violations()
        .iter()
        .map(|v| v.severity.weight())
        .sum();
    assert_eq!(session.risk_score, weighted);
    assert_eq!(session.total_warnings as usize, session.violations().len());
}

#[test]
fn test_full_pipeline_calibrate_monitor_report() {
    // 3.5s of calibration frames at 10 Hz, then 8s of empty frames at 2 Hz.
    let mut samples: Vec<Sample> = (0..35)
        .map(|i| Sample::new(at(i * 100), vec![neutral_face()], 0.02))
        .collect();
    let monitor_start = 3_500;
    samples.extend((0..16).map(|i| Sample::new(at(monitor_start + i * 500), Vec::new(), 0.02)));

    let thresholds = Thresholds::default();
    let receiver = ReplaySource::from_samples(samples).spawn(false, None);

    let mut calibrator = Some(Calibrator::new(&thresholds));
    let mut engine = None;
    let mut sink = NullAlertSink;

    for sample in receiver {
        if let Some(cal) = calibrator.as_mut() {
            cal.observe(&sample);
            if cal.is_complete(sample.timestamp) {
                let baseline = calibrator.take().unwrap().finish().unwrap();
                // Gaze baseline is the mean iris position of the neutral face.
                assert!((baseline.gaze_x - 0.5).abs() < 1e-9);
                assert!((baseline.noise_floor - 0.02 * 1.5).abs() < 1e-9);
                engine = Some(ProctorEngine::new(&thresholds, baseline, sample.timestamp));
            }
        } else if let Some(engine) = engine.as_mut() {
            engine.process(&sample, &mut sink);
        }
    }

    let session = engine.expect("calibration never completed").into_session();
    // The candidate was gone for 7.5s of monitored time: one absence.
    assert_eq!(session.counters.no_face, 1);

    let report = SessionReport::build(&session);
    assert_eq!(report.total_violations, 1);
    assert_eq!(report.risk_score, 10);
    assert_eq!(report.counters, session.counters);

    let json = serde_json::to_string(&report).unwrap();
    let back: SessionReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.risk_score, report.risk_score);
    assert_eq!(back.violations.len(), 1);
    assert_eq!(back.violations[0].kind, ViolationKind::FaceLeftFrame);
}
