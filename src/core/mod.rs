//! Core violation-detection and risk-scoring engine.
//!
//! This module contains:
//! - Calibration of the per-session baseline
//! - Stateless signal derivation from raw landmarks
//! - Temporal event detectors with hysteresis and rate gating
//! - The aggregator that turns triggers into scored, logged violations
//! - The per-sample engine tying it all together

pub mod calibration;
pub mod detectors;
pub mod monitor;
pub mod session;
pub mod signals;

// Re-export commonly used types
pub use calibration::{Baseline, Calibrator, DISABLED_NOISE_FLOOR};
pub use detectors::GazeDirection;
pub use monitor::{CycleStatus, ProctorEngine};
pub use session::{
    AlertSink, NullAlertSink, SessionCounters, SessionState, Severity, Violation, ViolationKind,
};
