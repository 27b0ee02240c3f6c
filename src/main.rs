// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! EdgeWatch - console for an edge object-detection device
//!
//! Runs either as a native egui console or headless, logging the session
//! and optionally exporting detection events on shutdown.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use edgewatch::core::{ConsoleEvent, Event};
use edgewatch::{Config, Console, EventFilter, VERSION};

/// EdgeWatch - edge inference device console
#[derive(Parser, Debug)]
#[command(name = "edgewatch")]
#[command(author = "EdgeWatch Project")]
#[command(version = VERSION)]
#[command(about = "Telemetry and detection console for an edge inference device")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device base URL, overrides the config file
    #[arg(long)]
    device: Option<String>,

    /// Streaming rate (1-30)
    #[arg(long)]
    fps: Option<u32>,

    /// Run in headless mode (no GUI)
    #[arg(long)]
    headless: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Do not paint detection overlays
    #[arg(long)]
    no_overlay: bool,

    /// Export events on shutdown (.csv or .jsonl)
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration; logging is not up yet
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level()?
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("EdgeWatch v{}", VERSION);

    // Override with command line args
    if let Some(device) = args.device {
        config.device.base_url = device;
    }
    if let Some(fps) = args.fps {
        config.streaming.fps = fps;
    }
    if args.no_overlay {
        config.overlay.enabled = false;
    }
    config.validate()?;

    info!("Configuration loaded from {:?}", config_path);
    info!("Device: {}", config.device.base_url);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    if args.headless {
        info!("Starting in headless mode...");
        let console = Arc::new(Console::new(config)?);
        runtime.block_on(run_headless(console, args.export))?;
    } else {
        #[cfg(feature = "gui")]
        {
            info!("Starting visual console...");
            run_gui(runtime, config)?;
        }

        #[cfg(not(feature = "gui"))]
        {
            drop(runtime);
            anyhow::bail!("GUI feature not enabled. Build with --features gui or use --headless");
        }
    }

    Ok(())
}

/// Drive the runtime on a helper thread while egui owns the main thread
#[cfg(feature = "gui")]
fn run_gui(runtime: tokio::runtime::Runtime, config: Config) -> Result<()> {
    let handle = runtime.handle().clone();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let driver = std::thread::Builder::new()
        .name("edgewatch-rt".to_string())
        .spawn(move || {
            runtime.block_on(async {
                let _ = shutdown_rx.await;
            });
        })?;

    let console = Arc::new(Console::new(config)?);
    let result = {
        let _enter = handle.enter();
        console.start();
        edgewatch::ui::run_gui(console.clone(), handle.clone())
    };

    console.shutdown();
    let _ = shutdown_tx.send(());
    if driver.join().is_err() {
        warn!("Runtime thread panicked");
    }
    result
}

/// Run the console without a GUI until Ctrl+C
async fn run_headless(console: Arc<Console>, export: Option<PathBuf>) -> Result<()> {
    let mut events = console.bus().subscribe_events();
    console.start();

    match console.refresh_health().await {
        Ok(health) if !health.model.loaded => {
            info!("Model not loaded, requesting load...");
            if let Err(e) = console.load_model().await {
                warn!("Model load failed: {}", e);
            }
        }
        Ok(_) => {}
        Err(e) => warn!("Device not healthy yet: {}", e),
    }
    start_streaming(&console);

    info!("EdgeWatch running in headless mode");
    info!("   Press Ctrl+C to shutdown");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            received = events.recv() => match received {
                Ok(event) => {
                    log_event(&event);
                    // the model may finish loading after startup
                    if let ConsoleEvent::HealthUpdated(health) = &event.payload {
                        if health.model.loaded && !console.streaming().is_running() {
                            start_streaming(&console);
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("Event log lagged, {} events skipped", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!("Shutdown signal received, cleaning up...");
    console.shutdown();

    let now = chrono::Utc::now();
    let stats = console.session().stats(now);
    info!(
        frames = stats.total_frames,
        avg_ms = stats.avg_latency_ms,
        p95_ms = stats.p95_latency_ms,
        events = console.session().event_count(),
        "Session summary"
    );

    if let Some(path) = export {
        let written = console.export_events(&EventFilter::default(), &path)?;
        info!("Wrote {} events to {:?}", written, path);
    }

    info!("EdgeWatch shutdown complete");
    Ok(())
}

fn start_streaming(console: &Console) {
    if let Err(e) = console.streaming().start() {
        warn!("Streaming not started: {}", e);
    }
}

fn log_event(event: &Event) {
    match &event.payload {
        ConsoleEvent::StatsUpdated(stats) => debug!(
            frames = stats.total_frames,
            avg_ms = stats.avg_latency_ms,
            p95_ms = stats.p95_latency_ms,
            per_minute = stats.detections_per_minute,
            "Stats"
        ),
        ConsoleEvent::Detection(detection) => info!(
            id = %detection.id,
            labels = %detection.labels().collect::<Vec<_>>().join(","),
            max_confidence = detection.max_confidence(),
            "Detection"
        ),
        ConsoleEvent::HealthUpdated(health) => debug!(
            status = ?health.status,
            model_loaded = health.model.loaded,
            camera = health.camera.available,
            "Health"
        ),
        ConsoleEvent::HealthDegraded { reason } => warn!("Device degraded: {}", reason),
        ConsoleEvent::AlarmUpdated(alarm) => debug!(enabled = alarm.enabled, active = alarm.active, "Alarm"),
        ConsoleEvent::StreamStateChanged(state) => info!("Streaming {:?}", state),
        ConsoleEvent::CycleFailed { code, message } => warn!(code, "Cycle failed: {}", message),
        ConsoleEvent::Error { code, message } => warn!(code, "{}", message),
    }
}
