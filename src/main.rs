//! Drone Remote ID capture
//!
//! Captures Wi-Fi beacon / NAN action frames and BLE advertisements carrying
//! Remote ID broadcasts, decodes them into per-aircraft telemetry records and
//! republishes them as JSON lines on stdout and as throttled compact messages
//! on a serial mesh link.

mod capture;
mod config;
mod decoder;
mod handoff;
mod odid;
mod output;
mod record;
mod stats;
mod uav_tracker;

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use capture::{BleCapture, BleScanConfig, WifiCapture};
use config::Config;
use output::{BufferedSink, OutputScheduler};
use stats::PipelineStats;
use uav_tracker::TrackTable;

/// Throttled channel destination; a disabled channel discards everything
fn open_mesh_output(config: &Config) -> Result<Box<dyn Write + Send>> {
    match &config.mesh_output {
        Some(path) => {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .with_context(|| format!("Failed to open mesh output {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::sink())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging goes to stderr; stdout is the JSON channel
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   Drone Remote ID Capture");
    info!("   Wi-Fi beacon / NAN + BLE decoder");
    info!("===========================================");

    let config = Config::from_env();

    info!("Configuration:");
    info!("  Track capacity: {} ({:?} eviction)", config.track_capacity, config.eviction);
    info!(
        "  Throttle: {} ms, pilot delay {} ms, max {} bytes, {:?} format",
        config.throttle_interval.as_millis(),
        config.pilot_delay.as_millis(),
        config.mesh_max_message,
        config.mesh_format
    );
    match &config.mesh_output {
        Some(path) => info!("  Mesh output: {}", path.display()),
        None => info!("  Mesh output: disabled"),
    }
    info!(
        "  Wi-Fi capture: {}",
        config.wifi_capture_cmd.as_deref().unwrap_or("<stdin>")
    );
    info!(
        "  BLE scan: {}",
        config.ble_scan_cmd.as_deref().unwrap_or("disabled")
    );

    let stats = Arc::new(PipelineStats::new());
    let (producer, consumer) = handoff::channel(config.track_capacity, stats.clone());

    let mut scheduler = OutputScheduler::new(
        TrackTable::new(config.track_capacity, config.eviction),
        BufferedSink::new(io::stdout(), config.output_buffer_bytes),
        BufferedSink::new(open_mesh_output(&config)?, config.output_buffer_bytes),
        config.throttle(),
        stats.clone(),
    );

    let mut wifi = WifiCapture::new(config.wifi_capture_cmd.clone());
    if let Err(e) = wifi.start(producer.clone()) {
        error!("Failed to start Wi-Fi capture: {}", e);
        error!("Make sure the sniffer helper is installed and the interface is in monitor mode.");
        return Err(e);
    }

    let ble = match &config.ble_scan_cmd {
        Some(command) => {
            let mut ble = BleCapture::new(BleScanConfig {
                command: command.clone(),
                window: config.ble_scan_window,
                pause: config.ble_scan_pause,
            });
            ble.start(producer.clone())
                .context("Failed to start BLE capture")?;
            Some(ble)
        }
        None => None,
    };
    drop(producer);

    info!("===========================================");
    info!("  Starting capture...");
    info!("  Press Ctrl+C to stop.");
    info!("===========================================");

    let poll_period = config.output_poll.max(Duration::from_millis(1));
    let mut poll = tokio::time::interval(poll_period);
    let mut heartbeat = tokio::time::interval(config.heartbeat_interval.max(Duration::from_secs(1)));
    heartbeat.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = poll.tick() => {
                scheduler.run_once(&consumer, Instant::now());

                let ble_running = ble.as_ref().is_some_and(BleCapture::is_running);
                if !wifi.is_running() && !ble_running && consumer.is_empty() {
                    warn!("All capture sources stopped");
                    break;
                }
            }
            _ = heartbeat.tick() => {
                scheduler.heartbeat();
            }
            res = &mut shutdown => {
                if let Err(e) = res {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown requested");
                break;
            }
        }
    }

    // Cleanup
    wifi.stop();
    if let Some(ble) = &ble {
        ble.stop();
    }

    // Let a pending operator line go out before exiting
    let deadline = Instant::now() + config.pilot_delay;
    while Instant::now() < deadline {
        scheduler.run_once(&consumer, Instant::now());
        tokio::time::sleep(poll_period).await;
    }
    scheduler.run_once(&consumer, Instant::now());

    info!("Shutdown complete. {}", stats.snapshot());
    Ok(())
}
