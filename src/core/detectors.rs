//! Temporal event detectors.
//!
//! One small state machine per behavior. Each consumes a scalar metric per
//! sample (clocked by the sample timestamp) and produces *triggers*:
//! candidate violations that still have to pass the aggregator's per-kind
//! cooldown. Hysteresis lives here; deduplication does not.
//!
//! Detectors that sustain a condition track it with a "since" timestamp.
//! When face tracking is lost those timers are cleared (see the individual
//! `reset` methods), so a condition never accumulates across face
//! loss/reacquisition.

use crate::core::session::ViolationKind;
use crate::core::signals;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Capacity of the shared blink-timestamp ring. The excessive-blink rate
/// check only runs once the ring is full.
const BLINK_HISTORY_CAPACITY: usize = 60;

/// Trailing window for the excessive-blink rate check, in seconds.
const BLINK_RATE_WINDOW_SECS: i64 = 60;

/// Capacity of the mouth-openness rolling window.
const MOUTH_WINDOW_CAPACITY: usize = 30;

/// Minimum mouth samples before the variance is meaningful.
const MOUTH_WINDOW_MIN: usize = 20;

/// Outcome of one blink-detector step.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlinkUpdate {
    /// A completed blink was registered this sample.
    pub blink: bool,
    /// Eyes have been closed past the sustain window.
    pub eyes_closed: bool,
    /// Blink rate over the trailing window is excessive.
    pub excessive_blinking: bool,
}

/// Blink, sustained eye closure, and blink-rate detection.
///
/// Closure and rate share one timestamp ring: every registered blink feeds
/// both the session's blink counter and the excessive-blink check.
#[derive(Debug)]
pub struct BlinkDetector {
    closure_threshold: f64,
    consecutive_required: u32,
    min_separation: Duration,
    sustain: Duration,
    rate_threshold: usize,
    closed_run: u32,
    eyes_closed_since: Option<DateTime<Utc>>,
    last_blink: Option<DateTime<Utc>>,
    history: VecDeque<DateTime<Utc>>,
}

impl BlinkDetector {
    pub fn new(
        closure_threshold: f64,
        consecutive_required: u32,
        min_separation_secs: f64,
        sustain_secs: f64,
        rate_threshold: usize,
    ) -> Self {
        Self {
            closure_threshold,
            consecutive_required,
            min_separation: secs(min_separation_secs),
            sustain: secs(sustain_secs),
            rate_threshold,
            closed_run: 0,
            eyes_closed_since: None,
            last_blink: None,
            history: VecDeque::with_capacity(BLINK_HISTORY_CAPACITY),
        }
    }

    /// Step with the current eye-closure ratio.
    ///
    /// A ratio of exactly zero means unresolvable geometry and never counts
    /// as closure.
    pub fn update(&mut self, closure_ratio: f64, now: DateTime<Utc>) -> BlinkUpdate {
        let mut update = BlinkUpdate::default();

        if closure_ratio > 0.0 && closure_ratio < self.closure_threshold {
            self.closed_run += 1;
            let since = *self.eyes_closed_since.get_or_insert(now);
            if now - since >= self.sustain {
                update.eyes_closed = true;
                // Restart the sustain window so the trigger repeats while
                // the eyes stay closed.
                self.eyes_closed_since = Some(now);
            }
        } else {
            if self.closed_run >= self.consecutive_required {
                let separated = match self.last_blink {
                    Some(last) => now - last > self.min_separation,
                    None => true,
                };
                if separated {
                    update.blink = true;
                    self.last_blink = Some(now);
                    if self.history.len() == BLINK_HISTORY_CAPACITY {
                        self.history.pop_front();
                    }
                    self.history.push_back(now);
                }
            }
            self.closed_run = 0;
            self.eyes_closed_since = None;
        }

        // Rate check only once the ring is full; occupancy alone says
        // nothing about elapsed time, so filter by it.
        if self.history.len() >= BLINK_HISTORY_CAPACITY {
            let window = Duration::seconds(BLINK_RATE_WINDOW_SECS);
            let recent = self.history.iter().filter(|&&t| now - t < window).count();
            if recent > self.rate_threshold {
                update.excessive_blinking = true;
            }
        }

        update
    }

    /// Clear run-length state on face loss. Blink history survives; it is
    /// rate bookkeeping, not an ongoing condition.
    pub fn reset(&mut self) {
        self.closed_run = 0;
        self.eyes_closed_since = None;
    }
}

/// Coarse gaze direction relative to the calibrated center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GazeDirection {
    Center,
    Left,
    Right,
    Up,
    Down,
    /// Irises unresolvable this sample.
    Unknown,
    /// No confidently tracked face.
    NoFace,
}

impl std::fmt::Display for GazeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GazeDirection::Center => "CENTER",
            GazeDirection::Left => "LEFT",
            GazeDirection::Right => "RIGHT",
            GazeDirection::Up => "UP",
            GazeDirection::Down => "DOWN",
            GazeDirection::Unknown => "UNKNOWN",
            GazeDirection::NoFace => "NO_FACE",
        };
        f.write_str(s)
    }
}

/// Sustained off-center gaze detection.
#[derive(Debug)]
pub struct GazeDetector {
    x_delta: f64,
    y_delta: f64,
    sustain: Duration,
    away_since: Option<DateTime<Utc>>,
}

impl GazeDetector {
    pub fn new(x_delta: f64, y_delta: f64, sustain_secs: f64) -> Self {
        Self {
            x_delta,
            y_delta,
            sustain: secs(sustain_secs),
            away_since: None,
        }
    }

    /// Step with the signed gaze offset from baseline, `None` when the
    /// irises did not resolve (timers are left untouched in that case).
    pub fn update(
        &mut self,
        offset: Option<(f64, f64)>,
        now: DateTime<Utc>,
    ) -> (GazeDirection, Option<ViolationKind>) {
        let Some((dx, dy)) = offset else {
            return (GazeDirection::Unknown, None);
        };

        if dx.abs() <= self.x_delta && dy.abs() <= self.y_delta {
            self.away_since = None;
            return (GazeDirection::Center, None);
        }

        // Axis of the larger absolute offset wins; ties go to x.
        let direction = if dx.abs() >= dy.abs() {
            if dx < 0.0 {
                GazeDirection::Left
            } else {
                GazeDirection::Right
            }
        } else if dy < 0.0 {
            GazeDirection::Up
        } else {
            GazeDirection::Down
        };

        let since = *self.away_since.get_or_insert(now);
        if now - since >= self.sustain {
            self.away_since = None;
            let kind = match direction {
                GazeDirection::Left => ViolationKind::GazeAwayLeft,
                GazeDirection::Right => ViolationKind::GazeAwayRight,
                GazeDirection::Up => ViolationKind::GazeAwayUp,
                _ => ViolationKind::GazeAwayDown,
            };
            (direction, Some(kind))
        } else {
            (direction, None)
        }
    }

    pub fn reset(&mut self) {
        self.away_since = None;
    }
}

/// Talking detection from mouth-motion variance.
#[derive(Debug)]
pub struct TalkingDetector {
    variance_threshold: f64,
    sustain: Duration,
    window: VecDeque<f64>,
    above_since: Option<DateTime<Utc>>,
}

impl TalkingDetector {
    pub fn new(variance_threshold: f64, sustain_secs: f64) -> Self {
        Self {
            variance_threshold,
            sustain: secs(sustain_secs),
            window: VecDeque::with_capacity(MOUTH_WINDOW_CAPACITY),
            above_since: None,
        }
    }

    /// Step with the current mouth openness; returns whether a talking
    /// trigger fired.
    pub fn update(&mut self, openness: f64, now: DateTime<Utc>) -> bool {
        if self.window.len() == MOUTH_WINDOW_CAPACITY {
            self.window.pop_front();
        }
        self.window.push_back(openness);

        if self.window.len() < MOUTH_WINDOW_MIN {
            return false;
        }

        let variance = signals::variance(self.window.make_contiguous());
        if variance > self.variance_threshold {
            match self.above_since {
                None => {
                    self.above_since = Some(now);
                    false
                }
                Some(since) if now - since > self.sustain => {
                    self.above_since = None;
                    true
                }
                Some(_) => false,
            }
        } else {
            self.above_since = None;
            false
        }
    }

    pub fn reset(&mut self) {
        self.above_since = None;
    }
}

/// Instantaneous head-turn check.
///
/// Deliberately has no sustain window of its own; only the aggregator's
/// per-kind cooldown limits its repetition.
pub fn head_turned(offset: Option<(f64, f64)>, x_threshold: f64, y_threshold: f64) -> bool {
    match offset {
        Some((dx, dy)) => dx >= x_threshold || dy >= y_threshold,
        None => false,
    }
}

/// Sustained-absence detection.
#[derive(Debug)]
pub struct PresenceDetector {
    sustain: Duration,
    absent_since: Option<DateTime<Utc>>,
}

impl PresenceDetector {
    pub fn new(sustain_secs: f64) -> Self {
        Self {
            sustain: secs(sustain_secs),
            absent_since: None,
        }
    }

    /// Step with whether any face is present this sample; returns whether an
    /// absence trigger fired. After a trigger the timer restarts, so a long
    /// absence keeps firing every sustain window.
    pub fn update(&mut self, face_present: bool, now: DateTime<Utc>) -> bool {
        if face_present {
            self.absent_since = None;
            return false;
        }

        let since = *self.absent_since.get_or_insert(now);
        if now - since >= self.sustain {
            self.absent_since = Some(now);
            true
        } else {
            false
        }
    }
}

/// Sustained loud-noise detection over consecutive samples.
#[derive(Debug)]
pub struct NoiseDetector {
    ratio_threshold: f64,
    consecutive_required: u32,
    loud_run: u32,
}

impl NoiseDetector {
    pub fn new(ratio_threshold: f64, consecutive_required: u32) -> Self {
        Self {
            ratio_threshold,
            consecutive_required,
            loud_run: 0,
        }
    }

    /// Step with the current noise ratio (RMS over calibrated floor);
    /// returns whether a noise trigger fired.
    pub fn update(&mut self, noise_ratio: f64) -> bool {
        if noise_ratio > self.ratio_threshold {
            self.loud_run += 1;
            if self.loud_run >= self.consecutive_required {
                self.loud_run = 0;
                return true;
            }
            false
        } else {
            self.loud_run = 0;
            false
        }
    }

    /// Clear the consecutive-sample run on face loss.
    pub fn reset(&mut self) {
        self.loud_run = 0;
    }
}

fn secs(value: f64) -> Duration {
    Duration::milliseconds((value * 1000.0).round() as i64)
}
