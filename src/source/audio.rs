//! Background ambient-noise sampling.
//!
//! Audio buffers arrive asynchronously with respect to the processing loop,
//! so the two sides meet at a single-slot cell holding the most recent RMS
//! value. Only the latest value matters; a stale read is acceptable by
//! design, and the processing loop never blocks waiting for audio.

use crate::core::signals;
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Lock-free single-slot cell for the current noise level (an `f64` stored
/// as its bit pattern).
#[derive(Debug)]
pub struct NoiseLevel(AtomicU64);

impl NoiseLevel {
    pub fn new() -> Self {
        Self(AtomicU64::new(0.0f64.to_bits()))
    }

    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

impl Default for NoiseLevel {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe shared noise level cell.
pub type SharedNoiseLevel = Arc<NoiseLevel>;

/// Create a new shared noise level cell.
pub fn shared_noise_level() -> SharedNoiseLevel {
    Arc::new(NoiseLevel::new())
}

/// Background worker that folds raw audio buffers into the shared cell.
///
/// The worker runs until the buffer channel disconnects, which is how the
/// audio collaborator (or process shutdown) releases it.
pub struct NoiseMonitor {
    level: SharedNoiseLevel,
    handle: Option<JoinHandle<()>>,
}

impl NoiseMonitor {
    /// Spawn the worker over a channel of raw audio buffers.
    pub fn start(buffers: Receiver<Vec<f64>>) -> Self {
        let level = shared_noise_level();
        let worker_level = Arc::clone(&level);
        let handle = thread::spawn(move || {
            for buffer in buffers {
                worker_level.set(signals::rms(&buffer));
            }
        });
        Self {
            level,
            handle: Some(handle),
        }
    }

    /// Handle to the shared cell for the processing loop.
    pub fn level(&self) -> SharedNoiseLevel {
        Arc::clone(&self.level)
    }

    /// Wait for the worker to finish. Returns once the buffer sender has
    /// been dropped.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
