//! Configuration for the vigil-proctor engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration: detection thresholds plus storage paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Detection thresholds and timing windows
    pub thresholds: Thresholds,

    /// Directory where session reports are written
    pub report_path: PathBuf,

    /// Path for storing state and logs
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vigil-proctor");

        Self {
            thresholds: Thresholds::default(),
            report_path: data_dir.join("reports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vigil-proctor")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.report_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Detection thresholds and timing windows.
///
/// Defaults are the reference values the detectors were tuned against.
/// Adjust with care, the sustain windows and cooldowns interact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Gaze calibration window
    #[serde(with = "duration_serde")]
    pub calibration_window: Duration,

    /// Quiet window for the audio noise floor
    #[serde(with = "duration_serde")]
    pub audio_calibration_window: Duration,

    /// Safety multiplier applied to the measured noise floor (>= 1)
    pub noise_floor_multiplier: f64,

    /// Minimum face detection confidence for per-face detectors
    pub face_confidence: f64,

    /// Eye-closure ratio below which the eyes count as closed
    pub eye_closure_threshold: f64,

    /// Consecutive closed samples required before a release counts as a blink
    pub blink_consecutive_samples: u32,

    /// Minimum separation between registered blinks, in seconds
    pub blink_min_separation_secs: f64,

    /// Sustained eye closure before an eyes-closed violation, in seconds
    pub eyes_closed_secs: f64,

    /// Blinks within the trailing 60s window above which blinking is excessive
    pub excessive_blink_threshold: usize,

    /// Per-axis gaze offset thresholds
    pub gaze_x_delta: f64,
    pub gaze_y_delta: f64,

    /// Sustained off-center gaze before a violation, in seconds
    pub gaze_away_secs: f64,

    /// Mouth-openness variance above which the candidate may be talking
    pub mouth_variance_threshold: f64,

    /// Sustained high mouth variance before a talking violation, in seconds
    pub talking_secs: f64,

    /// Per-axis head offset thresholds
    pub head_turn_x: f64,
    pub head_turn_y: f64,

    /// Sustained absence before a face-left-frame violation, in seconds
    pub no_face_secs: f64,

    /// Noise ratio (RMS / floor) above which a sample counts as loud
    pub noise_ratio_threshold: f64,

    /// Consecutive loud samples before a noise violation
    pub noise_consecutive_samples: u32,

    /// Per-kind violation emission cooldown, in seconds
    pub violation_cooldown_secs: f64,

    /// Global alert (notification) cooldown, in seconds
    pub alert_cooldown_secs: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            calibration_window: Duration::from_secs(3),
            audio_calibration_window: Duration::from_secs(2),
            noise_floor_multiplier: 1.5,
            face_confidence: 0.45,
            eye_closure_threshold: 0.18,
            blink_consecutive_samples: 2,
            blink_min_separation_secs: 0.35,
            eyes_closed_secs: 4.0,
            excessive_blink_threshold: 40,
            gaze_x_delta: 0.07,
            gaze_y_delta: 0.06,
            gaze_away_secs: 4.0,
            mouth_variance_threshold: 0.5,
            talking_secs: 2.5,
            head_turn_x: 0.22,
            head_turn_y: 0.18,
            no_face_secs: 6.0,
            noise_ratio_threshold: 3.5,
            noise_consecutive_samples: 30,
            violation_cooldown_secs: 5.0,
            alert_cooldown_secs: 3.0,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
