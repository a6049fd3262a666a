//! Session state, violation records, and the emission aggregator.
//!
//! Detector triggers are candidates, not violations. The [`Aggregator`] is
//! the single gate between the two: it deduplicates per kind through a
//! cooldown table, stamps severity, appends to the session's append-only
//! violation log, grows the risk score, and forwards the violation to the
//! alert sink under a separate global alert cooldown. All session mutation
//! funnels through here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of violation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    MultipleFaces,
    EyesClosedExtended,
    ExcessiveBlinking,
    GazeAwayLeft,
    GazeAwayRight,
    GazeAwayUp,
    GazeAwayDown,
    Talking,
    HeadTurned,
    FaceLeftFrame,
    LoudNoise,
}

impl ViolationKind {
    /// Number of kinds; sizes the cooldown table.
    pub const COUNT: usize = 11;

    /// Severity is a pure function of the kind.
    pub fn severity(self) -> Severity {
        match self {
            ViolationKind::MultipleFaces
            | ViolationKind::Talking
            | ViolationKind::FaceLeftFrame => Severity::High,
            ViolationKind::EyesClosedExtended
            | ViolationKind::ExcessiveBlinking
            | ViolationKind::GazeAwayLeft
            | ViolationKind::GazeAwayRight
            | ViolationKind::GazeAwayUp
            | ViolationKind::GazeAwayDown
            | ViolationKind::HeadTurned => Severity::Medium,
            ViolationKind::LoudNoise => Severity::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::MultipleFaces => "MULTIPLE_FACES",
            ViolationKind::EyesClosedExtended => "EYES_CLOSED_EXTENDED",
            ViolationKind::ExcessiveBlinking => "EXCESSIVE_BLINKING",
            ViolationKind::GazeAwayLeft => "GAZE_AWAY_LEFT",
            ViolationKind::GazeAwayRight => "GAZE_AWAY_RIGHT",
            ViolationKind::GazeAwayUp => "GAZE_AWAY_UP",
            ViolationKind::GazeAwayDown => "GAZE_AWAY_DOWN",
            ViolationKind::Talking => "TALKING",
            ViolationKind::HeadTurned => "HEAD_TURNED",
            ViolationKind::FaceLeftFrame => "FACE_LEFT_FRAME",
            ViolationKind::LoudNoise => "LOUD_NOISE",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Violation severity, ordered by weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Contribution to the cumulative risk score.
    pub fn weight(self) -> u32 {
        match self {
            Severity::High => 10,
            Severity::Medium => 5,
            Severity::Low => 2,
        }
    }
}

/// An emitted, deduplicated violation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub timestamp: DateTime<Utc>,
    pub kind: ViolationKind,
    pub severity: Severity,
}

/// Per-kind last-emission timestamps.
///
/// The kind set is closed and known at compile time, so this is a fixed
/// table indexed by the enum discriminant rather than a map.
#[derive(Debug, Default)]
pub struct ViolationTimers {
    last_emitted: [Option<DateTime<Utc>>; ViolationKind::COUNT],
}

impl ViolationTimers {
    pub fn last_emitted(&self, kind: ViolationKind) -> Option<DateTime<Utc>> {
        self.last_emitted[kind as usize]
    }

    pub fn mark_emitted(&mut self, kind: ViolationKind, at: DateTime<Utc>) {
        self.last_emitted[kind as usize] = Some(at);
    }
}

/// Cumulative per-kind violation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub gaze_away: u32,
    pub no_face: u32,
    pub multiple_faces: u32,
    pub talking: u32,
    pub eyes_closed: u32,
    pub excessive_blink: u32,
}

/// The process-wide session aggregate: counters, risk score, and the
/// append-only violation log. Created at session start; mutated only by the
/// [`Aggregator`] (and blink registration); snapshotted by the report
/// builder at session end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub started_at: DateTime<Utc>,
    /// Timestamp of the most recent processed sample.
    pub last_seen: DateTime<Utc>,
    pub counters: SessionCounters,
    pub total_blinks: u32,
    pub total_warnings: u32,
    pub risk_score: u32,
    violations: Vec<Violation>,
}

impl SessionState {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            last_seen: started_at,
            counters: SessionCounters::default(),
            total_blinks: 0,
            total_warnings: 0,
            risk_score: 0,
            violations: Vec::new(),
        }
    }

    /// Advance the session clock to the current sample.
    pub fn observe(&mut self, now: DateTime<Utc>) {
        if now > self.last_seen {
            self.last_seen = now;
        }
    }

    /// Register one completed blink.
    pub fn record_blink(&mut self) {
        self.total_blinks += 1;
    }

    /// Elapsed session time, by sample clock.
    pub fn duration(&self) -> Duration {
        self.last_seen - self.started_at
    }

    /// The emission-ordered violation log.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    fn append(&mut self, violation: Violation) {
        match violation.kind {
            ViolationKind::MultipleFaces => self.counters.multiple_faces += 1,
            ViolationKind::EyesClosedExtended => self.counters.eyes_closed += 1,
            ViolationKind::ExcessiveBlinking => self.counters.excessive_blink += 1,
            ViolationKind::GazeAwayLeft
            | ViolationKind::GazeAwayRight
            | ViolationKind::GazeAwayUp
            | ViolationKind::GazeAwayDown => self.counters.gaze_away += 1,
            ViolationKind::Talking => self.counters.talking += 1,
            ViolationKind::FaceLeftFrame => self.counters.no_face += 1,
            ViolationKind::HeadTurned | ViolationKind::LoudNoise => {}
        }
        self.total_warnings += 1;
        self.risk_score += violation.severity.weight();
        self.violations.push(violation);
    }
}

/// Receives violations as they are emitted. Alert delivery is throttled by
/// the aggregator's global cooldown; logging and scoring are not.
pub trait AlertSink {
    fn alert(&mut self, violation: &Violation);
}

/// Sink that discards alerts, for headless runs and tests.
#[derive(Debug, Default)]
pub struct NullAlertSink;

impl AlertSink for NullAlertSink {
    fn alert(&mut self, _violation: &Violation) {}
}

/// Deduplicates detector triggers into emitted violations.
#[derive(Debug)]
pub struct Aggregator {
    violation_cooldown: Duration,
    alert_cooldown: Duration,
    timers: ViolationTimers,
    last_alert: Option<DateTime<Utc>>,
}

impl Aggregator {
    pub fn new(violation_cooldown_secs: f64, alert_cooldown_secs: f64) -> Self {
        Self {
            violation_cooldown: secs_to_duration(violation_cooldown_secs),
            alert_cooldown: secs_to_duration(alert_cooldown_secs),
            timers: ViolationTimers::default(),
            last_alert: None,
        }
    }

    /// Emit a violation of `kind` at `now`, unless the per-kind cooldown
    /// suppresses it.
    ///
    /// A suppressed call is a silent no-op. A non-suppressed call appends
    /// exactly one log entry, bumps the matching counter and the warning
    /// total, adds the severity weight to the risk score, and notifies the
    /// sink when the global alert cooldown has elapsed. Returns whether the
    /// violation was emitted.
    pub fn emit(
        &mut self,
        session: &mut SessionState,
        kind: ViolationKind,
        now: DateTime<Utc>,
        sink: &mut dyn AlertSink,
    ) -> bool {
        if let Some(last) = self.timers.last_emitted(kind) {
            if now - last < self.violation_cooldown {
                return false;
            }
        }
        self.timers.mark_emitted(kind, now);

        let violation = Violation {
            timestamp: now,
            kind,
            severity: kind.severity(),
        };
        session.append(violation.clone());

        let alert_due = match self.last_alert {
            Some(last) => now - last > self.alert_cooldown,
            None => true,
        };
        if alert_due {
            sink.alert(&violation);
            self.last_alert = Some(now);
        }

        true
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::milliseconds((secs * 1000.0).round() as i64)
}
