//! Session calibration: reference gaze point and audio noise floor.
//!
//! Calibration is a blocking phase at session start. The candidate looks at
//! the camera for a fixed window while the calibrator accumulates iris
//! positions; in parallel it averages the ambient RMS over a shorter quiet
//! window. Both baselines are frozen into a [`Baseline`] that detectors read
//! for the rest of the session.

use crate::config::Thresholds;
use crate::core::signals;
use crate::error::EngineError;
use crate::source::types::Sample;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Noise floor used when audio is unavailable or the quiet window yielded
/// nothing. With no audio collaborator the measured level stays at zero, so
/// against this floor the noise ratio never crosses any threshold and noise
/// detection is effectively disabled for the session.
pub const DISABLED_NOISE_FLOOR: f64 = 1e-6;

/// Calibrated per-session reference values. Exactly one per session,
/// immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// Reference gaze x coordinate in normalized frame space
    pub gaze_x: f64,
    /// Reference gaze y coordinate in normalized frame space
    pub gaze_y: f64,
    /// Ambient audio RMS floor, already scaled by the safety multiplier
    pub noise_floor: f64,
}

/// Accumulates calibration samples and produces a [`Baseline`].
#[derive(Debug)]
pub struct Calibrator {
    gaze_window: Duration,
    audio_window: Duration,
    noise_floor_multiplier: f64,
    started: Option<DateTime<Utc>>,
    gaze_x_sum: f64,
    gaze_y_sum: f64,
    gaze_count: u32,
    noise_sum: f64,
    noise_count: u32,
    audio_available: bool,
}

impl Calibrator {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            gaze_window: Duration::from_std(thresholds.calibration_window)
                .unwrap_or_else(|_| Duration::seconds(3)),
            audio_window: Duration::from_std(thresholds.audio_calibration_window)
                .unwrap_or_else(|_| Duration::seconds(2)),
            noise_floor_multiplier: thresholds.noise_floor_multiplier.max(1.0),
            started: None,
            gaze_x_sum: 0.0,
            gaze_y_sum: 0.0,
            gaze_count: 0,
            noise_sum: 0.0,
            noise_count: 0,
            audio_available: true,
        }
    }

    /// Mark the audio collaborator as unavailable. Noise detection will be
    /// disabled for the session; this is a degraded mode, not a failure.
    pub fn disable_audio(&mut self) {
        self.audio_available = false;
    }

    /// Feed one calibration sample.
    ///
    /// A sample contributes to the gaze baseline iff it contains exactly one
    /// face whose iris centers resolve. Noise levels contribute only during
    /// the (shorter) quiet audio window.
    pub fn observe(&mut self, sample: &Sample) {
        let started = *self.started.get_or_insert(sample.timestamp);

        if let [face] = sample.faces.as_slice() {
            if let Some((x, y)) = signals::iris_average(face) {
                self.gaze_x_sum += x;
                self.gaze_y_sum += y;
                self.gaze_count += 1;
            }
        }

        if self.audio_available && sample.timestamp - started < self.audio_window {
            self.noise_sum += sample.noise_level;
            self.noise_count += 1;
        }
    }

    /// Whether the calibration window has elapsed, measured by sample time.
    pub fn is_complete(&self, now: DateTime<Utc>) -> bool {
        match self.started {
            Some(started) => now - started >= self.gaze_window,
            None => false,
        }
    }

    /// Number of valid gaze samples collected so far.
    pub fn valid_samples(&self) -> u32 {
        self.gaze_count
    }

    /// Finalize the baseline.
    ///
    /// Fails with [`EngineError::CalibrationFailed`] when no valid gaze
    /// sample was collected; the session must abort. An empty audio window
    /// only disables noise detection.
    pub fn finish(self) -> Result<Baseline, EngineError> {
        if self.gaze_count == 0 {
            return Err(EngineError::CalibrationFailed);
        }

        let noise_floor = if self.audio_available && self.noise_count > 0 {
            let mean = self.noise_sum / f64::from(self.noise_count);
            (mean * self.noise_floor_multiplier).max(DISABLED_NOISE_FLOOR)
        } else {
            DISABLED_NOISE_FLOOR
        };

        Ok(Baseline {
            gaze_x: self.gaze_x_sum / f64::from(self.gaze_count),
            gaze_y: self.gaze_y_sum / f64::from(self.gaze_count),
            noise_floor,
        })
    }
}
