//! Session report building and persistence.
//!
//! At session end, however it ends, the final [`SessionState`] is frozen
//! into a [`SessionReport`]: one immutable snapshot of every counter, the
//! risk score, and the full ordered violation log. Building a report cannot
//! fail; only writing it to disk can.

use crate::core::session::{SessionCounters, SessionState, Violation};
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The name of this producer, recorded in every report.
pub const PRODUCER_NAME: &str = "vigil-proctor";

/// Display-only classification of the final risk score. Never fed back
/// into any detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score > 50 {
            RiskLevel::High
        } else if score > 25 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

/// Immutable end-of-session snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Unique report identifier
    pub session_id: Uuid,
    /// Producing software
    pub producer: String,
    /// Software version
    pub version: String,
    /// Hostname of the proctoring station
    pub device: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub total_violations: usize,
    pub total_warnings: u32,
    pub total_blinks: u32,
    pub counters: SessionCounters,
    /// Full violation log, ordered by emission time
    pub violations: Vec<Violation>,
}

impl SessionReport {
    /// Snapshot a session. Infallible by design: this runs on every exit
    /// path, including aborts caused by collaborator failures.
    pub fn build(session: &SessionState) -> Self {
        let device = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            session_id: Uuid::new_v4(),
            producer: PRODUCER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            device,
            started_at: session.started_at,
            ended_at: session.last_seen,
            duration_seconds: session.duration().num_milliseconds() as f64 / 1000.0,
            risk_score: session.risk_score,
            risk_level: RiskLevel::from_score(session.risk_score),
            total_violations: session.violations().len(),
            total_warnings: session.total_warnings,
            total_blinks: session.total_blinks,
            counters: session.counters.clone(),
            violations: session.violations().to_vec(),
        }
    }

    /// Write the report as pretty JSON into `dir`, returning the path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, EngineError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "exam_report_{}.json",
            self.ended_at.format("%Y%m%d_%H%M%S")
        ));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Human-readable summary block for the console.
    pub fn summary(&self) -> String {
        let verdict = match self.risk_level {
            RiskLevel::High => "WARNING: HIGH RISK EXAM SESSION DETECTED",
            RiskLevel::Moderate => "WARNING: MODERATE RISK DETECTED",
            RiskLevel::Low => "Exam session completed with low risk",
        };

        format!(
            "Session Report:\n\
             - Duration: {:.1} seconds\n\
             - Risk score: {} ({:?})\n\
             - Violations: {} ({} warnings)\n\
             - Blinks: {}\n\
             - Gaze away: {}\n\
             - Left frame: {}\n\
             - Multiple faces: {}\n\
             - Talking: {}\n\
             - Eyes closed: {}\n\
             - Excessive blinking: {}\n\
             \n\
             {}",
            self.duration_seconds,
            self.risk_score,
            self.risk_level,
            self.total_violations,
            self.total_warnings,
            self.total_blinks,
            self.counters.gaze_away,
            self.counters.no_face,
            self.counters.multiple_faces,
            self.counters.talking,
            self.counters.eyes_closed,
            self.counters.excessive_blink,
            verdict
        )
    }
}
