//! Error types for the proctoring engine.

use thiserror::Error;

/// Fatal conditions surfaced by the engine.
///
/// Detector-level geometry problems are never errors; they degrade to
/// neutral signal values inside the pipeline. A sample source that can
/// produce nothing further is signaled by its channel disconnecting, not
/// by an error value. What remains are the session-aborting cases: a
/// calibration window with no usable face, and report I/O. Callers are
/// expected to still build a best-effort session report on every one of
/// these paths.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("calibration failed: no face detected during the calibration window")]
    CalibrationFailed,

    #[error("failed to write session report: {0}")]
    Report(#[from] std::io::Error),

    #[error("failed to serialize session report: {0}")]
    ReportEncoding(#[from] serde_json::Error),
}
