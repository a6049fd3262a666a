//! Vigil Proctor CLI
//!
//! Behavioral proctoring engine for remote exam sessions.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vigil_proctor::{
    config::Config,
    core::{AlertSink, Calibrator, GazeDirection, ProctorEngine, Violation},
    report::SessionReport,
    source::{shared_noise_level, ReplaySource},
    VERSION,
};

#[derive(Parser)]
#[command(name = "vigil-proctor")]
#[command(version = VERSION)]
#[command(about = "Behavioral proctoring engine for remote exam sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a proctoring session over a recorded sample stream
    Run {
        /// Sample stream to process (JSON Lines, one sample per line)
        samples: PathBuf,

        /// Directory for the session report (defaults to the configured path)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Pace samples by their timestamps instead of replaying flat out
        #[arg(long)]
        realtime: bool,

        /// Disable audio noise detection for this session
        #[arg(long)]
        no_audio: bool,
    },

    /// Display a saved session report
    Report {
        /// Report file to read
        file: PathBuf,
    },

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            samples,
            output,
            realtime,
            no_audio,
        } => {
            cmd_run(&samples, output, realtime, no_audio);
        }
        Commands::Report { file } => {
            cmd_report(&file);
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

/// Sink that prints alerts as they clear the aggregator's cooldowns.
struct ConsoleAlertSink;

impl AlertSink for ConsoleAlertSink {
    fn alert(&mut self, violation: &Violation) {
        println!(
            "[{}] ALERT ({:?}): {}",
            violation.timestamp.format("%H:%M:%S"),
            violation.severity,
            violation.kind
        );
    }
}

fn cmd_run(samples: &PathBuf, output: Option<PathBuf>, realtime: bool, no_audio: bool) {
    println!("Vigil Proctor v{VERSION}");
    println!();

    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let source = match ReplaySource::from_path(samples) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {samples:?}: {e}");
            std::process::exit(1);
        }
    };
    if source.is_empty() {
        eprintln!("Error: {samples:?} contains no samples");
        std::process::exit(1);
    }
    if source.skipped() > 0 {
        eprintln!("Warning: Skipped {} undecodable line(s)", source.skipped());
    }
    println!("Loaded {} samples from {:?}", source.len(), samples);

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    // The replay source plays the audio collaborator role: it publishes
    // each sample's noise level to the shared cell, which the status line
    // reads back the way a live audio worker would be read.
    let noise = (!no_audio).then(shared_noise_level);
    let receiver = source.spawn(realtime, noise.clone());

    // Calibration phase: the candidate looks at the camera in a quiet room
    // until the window elapses.
    println!();
    println!("Calibrating... look directly at the camera and stay quiet.");

    let thresholds = config.thresholds.clone();
    let mut calibrator = Calibrator::new(&thresholds);
    if no_audio {
        calibrator.disable_audio();
        println!("Audio disabled: noise detection is off for this session.");
    }

    let mut session_start: Option<DateTime<Utc>> = None;
    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(mut sample) => {
                if no_audio {
                    sample.noise_level = 0.0;
                }
                calibrator.observe(&sample);
                if calibrator.is_complete(sample.timestamp) {
                    session_start = Some(sample.timestamp);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Warning: Sample stream ended during calibration");
                break;
            }
        }
    }

    if !running.load(Ordering::SeqCst) {
        println!();
        println!("Interrupted during calibration, no session started.");
        return;
    }

    let collected = calibrator.valid_samples();
    let baseline = match calibrator.finish() {
        Ok(baseline) => baseline,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("No usable face was seen during calibration. Check lighting and framing.");
            std::process::exit(1);
        }
    };
    let session_start = session_start.unwrap_or_else(Utc::now);

    println!(
        "Calibration complete: {} valid samples, gaze ({:.3}, {:.3}), noise floor {:.6}",
        collected, baseline.gaze_x, baseline.gaze_y, baseline.noise_floor
    );
    println!();
    println!("Monitoring. Press Ctrl+C to end the session.");
    println!();

    // Monitoring phase
    let mut engine = ProctorEngine::new(&thresholds, baseline, session_start);
    let mut sink = ConsoleAlertSink;
    let mut last_status: Option<DateTime<Utc>> = None;

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(mut sample) => {
                if no_audio {
                    sample.noise_level = 0.0;
                }
                let status = engine.process(&sample, &mut sink);

                // Status line every 5 seconds of stream time.
                let due = match last_status {
                    Some(last) => sample.timestamp - last >= chrono::Duration::seconds(5),
                    None => true,
                };
                if due {
                    let gaze = match status.gaze {
                        GazeDirection::NoFace => "no face".to_string(),
                        other => format!("{other:?}").to_lowercase(),
                    };
                    let ambient = noise.as_ref().map(|cell| cell.get()).unwrap_or(0.0);
                    println!(
                        "[{}] faces: {} | gaze: {} | noise: {:.4} | blinks: {} | violations: {} | risk: {}",
                        sample.timestamp.format("%H:%M:%S"),
                        status.face_count,
                        gaze,
                        ambient,
                        status.total_blinks,
                        status.total_violations,
                        status.risk_score
                    );
                    last_status = Some(sample.timestamp);
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                println!("Sample stream ended.");
                break;
            }
        }
    }

    // End of session: freeze the aggregate into a report and persist it.
    println!();
    println!("Ending session...");

    let session = engine.into_session();
    let report = SessionReport::build(&session);
    let report_dir = output.unwrap_or_else(|| config.report_path.clone());

    match report.save(&report_dir) {
        Ok(path) => println!("Report written to {path:?}"),
        Err(e) => eprintln!("Error writing report: {e}"),
    }

    println!();
    println!("{}", report.summary());
}

fn cmd_report(file: &PathBuf) {
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {file:?}: {e}");
            std::process::exit(1);
        }
    };
    let report: SessionReport = match serde_json::from_str(&content) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error parsing {file:?}: {e}");
            std::process::exit(1);
        }
    };

    println!("Session {}", report.session_id);
    println!("Device: {} ({} v{})", report.device, report.producer, report.version);
    println!(
        "From {} to {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        report.ended_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!();
    println!("{}", report.summary());

    if !report.violations.is_empty() {
        println!();
        println!("Violation log:");
        for violation in &report.violations {
            println!(
                "  [{}] {:?}: {}",
                violation.timestamp.format("%H:%M:%S"),
                violation.severity,
                violation.kind
            );
        }
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}
