//! Collaborator seams: sample ingestion and background audio sampling.
//!
//! The engine itself never touches a device. Samples arrive from whatever
//! camera/landmark collaborator feeds the channel; the ambient noise level
//! arrives through a shared single-slot cell updated by a background
//! worker. This module provides the types for both plus a file-based
//! replay source for headless runs and tests.

pub mod audio;
pub mod replay;
pub mod types;

// Re-export commonly used types
pub use audio::{shared_noise_level, NoiseMonitor, SharedNoiseLevel};
pub use replay::ReplaySource;
pub use types::{mesh, Face, Landmark, Sample};
