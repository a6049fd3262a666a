//! File-based sample replay.
//!
//! A recorded session is a JSON-Lines file of [`Sample`]s. The replay
//! source feeds them into a channel from a background thread, optionally
//! paced by their timestamps, standing in for the live camera and audio
//! collaborators. A line that fails to decode is a transient per-cycle
//! failure: it is skipped, never propagated.

use crate::source::audio::SharedNoiseLevel;
use crate::source::types::Sample;
use crossbeam_channel::{bounded, Receiver};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Upper bound on inter-sample sleep when pacing by timestamps, so a gap in
/// a recording cannot stall a replay indefinitely.
const MAX_PACING_GAP: Duration = Duration::from_secs(2);

/// Replays recorded samples as if they were live.
pub struct ReplaySource {
    samples: Vec<Sample>,
    skipped: usize,
}

impl ReplaySource {
    /// Load a JSONL recording. Undecodable lines are skipped and counted.
    pub fn from_path(path: &Path) -> Result<Self, std::io::Error> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);

        let mut samples = Vec::new();
        let mut skipped = 0usize;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Sample>(&line) {
                Ok(sample) => samples.push(sample),
                Err(_) => skipped += 1,
            }
        }

        Ok(Self { samples, skipped })
    }

    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            skipped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of lines that failed to decode during loading.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Start feeding samples into a channel from a background thread.
    ///
    /// With `realtime` set, delivery is paced by the recorded timestamp
    /// deltas (gaps capped). When a noise cell is supplied, the source also
    /// plays the audio collaborator role and publishes each sample's noise
    /// level before sending it.
    pub fn spawn(self, realtime: bool, noise: Option<SharedNoiseLevel>) -> Receiver<Sample> {
        let (sender, receiver) = bounded(256);

        thread::spawn(move || {
            let mut previous: Option<chrono::DateTime<chrono::Utc>> = None;
            for sample in self.samples {
                if realtime {
                    if let Some(prev) = previous {
                        if let Ok(gap) = (sample.timestamp - prev).to_std() {
                            thread::sleep(gap.min(MAX_PACING_GAP));
                        }
                    }
                    previous = Some(sample.timestamp);
                }

                if let Some(ref cell) = noise {
                    cell.set(sample.noise_level);
                }

                // Receiver gone means the session ended early; stop quietly.
                if sender.send(sample).is_err() {
                    break;
                }
            }
        });

        receiver
    }
}
