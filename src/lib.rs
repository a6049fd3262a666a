//! Vigil Proctor - Behavioral proctoring engine for remote exam sessions.
//!
//! The engine turns a stream of per-frame behavioral samples (face landmarks
//! plus an ambient noise level) into a calibrated, debounced, severity-scored
//! violation log and a final session report. All detection is clocked by the
//! timestamps carried on the samples, never by the wall clock, so the same
//! sample stream always produces the same report.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Vigil Proctor                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌─────────────┐   ┌───────────────────────┐  │
//! │  │  Source  │──▶│ Calibration │──▶│   Detectors           │  │
//! │  │ (replay) │   │ (baselines) │   │ (blink/gaze/talk/...) │  │
//! │  └──────────┘   └─────────────┘   └───────────────────────┘  │
//! │       │                                      │               │
//! │       ▼                                      ▼               │
//! │  ┌──────────┐                        ┌──────────────┐        │
//! │  │  Noise   │                        │  Aggregator  │        │
//! │  │ Monitor  │                        │  (cooldowns) │        │
//! │  └──────────┘                        └──────┬───────┘        │
//! │                                             ▼                │
//! │                                      ┌──────────────┐        │
//! │                                      │   Session    │        │
//! │                                      │  + Report    │        │
//! │                                      └──────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use vigil_proctor::config::Thresholds;
//! use vigil_proctor::core::{Calibrator, NullAlertSink, ProctorEngine};
//! use vigil_proctor::source::ReplaySource;
//!
//! let thresholds = Thresholds::default();
//! let source = ReplaySource::from_path("session.jsonl".as_ref()).unwrap();
//! let receiver = source.spawn(false, None);
//!
//! let mut calibrator = Some(Calibrator::new(&thresholds));
//! let mut sink = NullAlertSink;
//! let mut engine = None;
//!
//! for sample in receiver {
//!     if let Some(cal) = calibrator.as_mut() {
//!         cal.observe(&sample);
//!         if cal.is_complete(sample.timestamp) {
//!             let baseline = calibrator.take().unwrap().finish().unwrap();
//!             engine = Some(ProctorEngine::new(&thresholds, baseline, sample.timestamp));
//!         }
//!     } else if let Some(engine) = engine.as_mut() {
//!         let status = engine.process(&sample, &mut sink);
//!         println!("risk={}", status.risk_score);
//!     }
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod report;
pub mod source;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, Thresholds};
pub use core::{
    AlertSink, Baseline, Calibrator, CycleStatus, GazeDirection, NullAlertSink, ProctorEngine,
    SessionState, Severity, Violation, ViolationKind,
};
pub use error::EngineError;
pub use report::{RiskLevel, SessionReport};
pub use source::{NoiseMonitor, ReplaySource, Sample};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
