//! Thermascan - interactive thermal scan experience
//!
//! Runs a full scan session against the synthetic camera and a scripted
//! presence model, emitting per-frame reports as JSON lines. Useful for
//! exercising the pipeline end to end without a device attached.
//!
//! # Usage
//!
//! ```bash
//! # Run a 30-second simulated session
//! cargo run --release -- --duration 30
//!
//! # Smaller output buffer, fixed seed, reports to a file
//! cargo run --release -- --width 180 --height 320 --seed 7 --out reports.jsonl
//! ```
//!
//! # Environment Variables
//!
//! - `THERMASCAN_CONFIG`: Path to a scan_config.toml
//! - `RUST_LOG`: Logging level (default: info)

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use thermascan::camera::SyntheticCamera;
use thermascan::clock::SystemClock;
use thermascan::config::{self, ScanConfig};
use thermascan::perception::{PerceptionGate, ScriptedPresenceModel};
use thermascan::session::{RenderSink, ScanSession};
use thermascan::types::{FrameBuffer, FrameReport};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "thermascan")]
#[command(about = "Thermal scan experience - simulated session driver")]
#[command(version)]
struct CliArgs {
    /// Session duration in seconds (0 = run until Ctrl-C)
    #[arg(long, default_value = "30")]
    duration: u64,

    /// Override the output buffer width
    #[arg(long)]
    width: Option<u32>,

    /// Override the output buffer height
    #[arg(long)]
    height: Option<u32>,

    /// Disable the selfie mirror
    #[arg(long)]
    no_mirror: bool,

    /// Seed for the outcome RNG (reproducible sessions)
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Frames the synthetic subject takes to appear
    #[arg(long, default_value = "30")]
    presence_after: u64,

    /// Synthetic camera frame interval in milliseconds
    #[arg(long, default_value = "33")]
    frame_interval_ms: u64,

    /// Write per-frame JSONL reports to this file instead of stdout
    #[arg(long)]
    out: Option<String>,

    /// Simulate a missing perception model (degraded-state demo)
    #[arg(long)]
    no_model: bool,
}

// ============================================================================
// JSONL render sink
// ============================================================================

/// Render collaborator stand-in: serializes every per-frame report as one
/// JSON line. Frame pixels are summarized (mean luminance), not dumped.
struct JsonlSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> RenderSink for JsonlSink<W> {
    fn present(&mut self, frame: &FrameBuffer, report: &FrameReport) {
        let mean = if frame.as_bytes().is_empty() {
            0.0
        } else {
            let sum: u64 = frame.as_bytes().iter().map(|&b| u64::from(b)).sum();
            sum as f64 / frame.as_bytes().len() as f64
        };
        let line = serde_json::json!({
            "report": report,
            "mean_channel": (mean * 10.0).round() / 10.0,
        });
        if let Err(e) = writeln!(self.writer, "{line}") {
            warn!(error = %e, "Failed to write frame report");
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let mut scan_config = ScanConfig::load();
    if let Some(width) = args.width {
        scan_config.output.width = width;
    }
    if let Some(height) = args.height {
        scan_config.output.height = height;
    }
    if args.no_mirror {
        scan_config.output.mirror = false;
    }
    scan_config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Invalid scan configuration")?;
    config::init(scan_config.clone());

    info!(
        width = scan_config.output.width,
        height = scan_config.output.height,
        mirror = scan_config.output.mirror,
        seed = args.seed,
        "Starting thermascan session"
    );

    let camera = SyntheticCamera::new(args.frame_interval_ms);
    let gate = if args.no_model {
        PerceptionGate::disabled(&thermascan::perception::PerceptionError::LoadFailed(
            "disabled via --no-model".to_string(),
        ))
    } else {
        PerceptionGate::new(
            Box::new(ScriptedPresenceModel::present_after(args.presence_after)),
            scan_config.perception.min_confidence,
        )
    };

    let cancel = CancellationToken::new();

    // Ctrl-C and the optional duration limit both stop the session.
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received — shutting down");
            signal_cancel.cancel();
        }
    });
    if args.duration > 0 {
        let timed_cancel = cancel.clone();
        let duration = std::time::Duration::from_secs(args.duration);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            info!(secs = duration.as_secs(), "Session duration reached");
            timed_cancel.cancel();
        });
    }

    let result = match &args.out {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create report file {path}"))?;
            let sink = JsonlSink { writer: std::io::BufWriter::new(file) };
            run_session(camera, gate, scan_config, sink, args.seed, cancel).await
        }
        None => {
            let sink = JsonlSink { writer: std::io::stdout() };
            run_session(camera, gate, scan_config, sink, args.seed, cancel).await
        }
    };

    result.context("Scan session failed")
}

async fn run_session<S: RenderSink>(
    camera: SyntheticCamera,
    gate: PerceptionGate,
    scan_config: ScanConfig,
    sink: S,
    seed: u64,
    cancel: CancellationToken,
) -> Result<()> {
    let mut session = ScanSession::new(
        camera,
        gate,
        scan_config,
        Arc::new(SystemClock),
        sink,
        seed,
        cancel,
    );
    session.run().await?;
    info!(stats = %session.stats(), "Session finished");
    Ok(())
}
