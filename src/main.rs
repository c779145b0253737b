use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use voxsweep::config::Settings;
use voxsweep::queue::{CaptureQueue, InMemoryCaptureQueue};
use voxsweep::scanner::ScanController;
use voxsweep::sdr::ReplaySdrDevice;

/// Wideband SDR scanner: surveys configured center frequencies and queues
/// speech-like narrowband captures.
#[derive(Parser, Debug)]
#[command(name = "voxsweep")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "./settings.toml")]
    config: PathBuf,

    /// Replay a recorded WAV file as the IQ source instead of live hardware.
    /// Real SDR hardware backends are out of scope for this crate.
    #[arg(short, long, value_name = "WAV")]
    replay: PathBuf,

    /// Verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "voxsweep=debug"
    } else {
        "voxsweep=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    info!("starting voxsweep");

    let settings = Settings::load(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    let sdr = ReplaySdrDevice::from_wav(&args.replay)
        .with_context(|| format!("loading replay source from {}", args.replay.display()))?;
    let queue = InMemoryCaptureQueue::new();

    let running = Arc::new(AtomicBool::new(true));
    let ctrlc_running = running.clone();
    ctrlc::set_handler(move || {
        info!("shutdown signal received");
        ctrlc_running.store(false, Ordering::Relaxed);
    })
    .context("installing signal handler")?;

    let mut controller = ScanController::new(sdr, queue, settings, running.clone());

    let worker = std::thread::spawn(move || {
        if let Err(e) = controller.run() {
            error!(error = %e, "scanner stopped with an error");
            return Err(e);
        }
        Ok(controller)
    });

    let controller = worker
        .join()
        .map_err(|_| anyhow::anyhow!("scanner thread panicked"))?
        .context("scanner run loop failed")?;

    info!("scanner shutdown complete, draining queue");
    while !controller.queue().empty() {
        if let Some(capture) = controller.queue().get() {
            info!(
                signal_freq = capture.signal_frequency_hz,
                power_db = capture.power_db,
                bandwidth_hz = capture.bandwidth_hz,
                "captured"
            );
        }
    }

    Ok(())
}
