//! BLE capture: scanner helper output driven through a scan duty cycle
//!
//! A reader thread pushes advertisements into a bounded scan-result buffer.
//! The scan thread collects results for one scan window, drains the batch
//! through the decoder, then pauses before the next window.

use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, trace, warn};

use crate::decoder::RawFrame;
use crate::handoff::Producer;

use super::line::parse_ble_line;
use super::{kill_helper, process_frame, spawn_helper, HelperHandle};

/// Scan results held between two drains
const SCAN_BUFFER_CAPACITY: usize = 256;

/// Scan duty cycle
#[derive(Debug, Clone)]
pub struct BleScanConfig {
    pub command: String,
    pub window: Duration,
    pub pause: Duration,
}

/// BLE capture controller
pub struct BleCapture {
    config: BleScanConfig,
    running: Arc<AtomicBool>,
    helper: HelperHandle,
}

impl BleCapture {
    pub fn new(config: BleScanConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            helper: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the scanner helper, the reader thread and the scan thread
    pub fn start(&mut self, producer: Producer) -> Result<()> {
        info!(
            "BLE scan window {} ms, pause {} ms",
            self.config.window.as_millis(),
            self.config.pause.as_millis()
        );

        let (helper, stdout) = spawn_helper(&self.config.command, "ble")?;
        self.helper = helper;

        let (result_tx, result_rx) = bounded::<RawFrame>(SCAN_BUFFER_CAPACITY);
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let stats = producer.stats().clone();
        thread::Builder::new()
            .name("ble-reader".to_string())
            .spawn(move || {
                read_results(BufReader::new(stdout), &running, &result_tx, || {
                    stats.record_unparsable()
                });
            })
            .context("Failed to spawn BLE reader thread")?;

        let running = self.running.clone();
        let config = self.config.clone();
        thread::Builder::new()
            .name("ble-scan".to_string())
            .spawn(move || {
                scan_loop(&config, &running, &result_rx, &producer);
                info!("BLE scan stopped: {}", producer.stats().snapshot());
            })
            .context("Failed to spawn BLE scan thread")?;

        Ok(())
    }

    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Stopping BLE capture...");
        }
        kill_helper(&self.helper);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for BleCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Parse scanner lines into the scan-result buffer until EOF or stop
fn read_results<R: BufRead>(
    reader: R,
    running: &AtomicBool,
    results: &Sender<RawFrame>,
    on_unparsable: impl Fn(),
) {
    for line in reader.lines() {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Error reading BLE scanner output: {}", e);
                break;
            }
        };

        match parse_ble_line(&line) {
            Ok(Some(frame)) => {
                if results.try_send(frame).is_err() {
                    trace!("Scan result buffer full, dropping advertisement");
                }
            }
            Ok(None) => {}
            Err(e) => {
                on_unparsable();
                debug!("Failed to parse BLE line: {}", e);
            }
        }
    }

    if running.load(Ordering::SeqCst) {
        warn!("BLE scanner output closed (EOF)");
    }
}

/// One scan window: wait for results until the window closes.
///
/// Returns false once the result source is gone and empty.
fn collect_window(results: &Receiver<RawFrame>, window: Duration, batch: &mut Vec<RawFrame>) -> bool {
    let deadline = Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        match results.recv_timeout(remaining) {
            Ok(frame) => batch.push(frame),
            Err(RecvTimeoutError::Timeout) => return true,
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}

/// Scan, drain, pause
fn scan_loop(config: &BleScanConfig, running: &AtomicBool, results: &Receiver<RawFrame>, producer: &Producer) {
    let mut batch = Vec::with_capacity(SCAN_BUFFER_CAPACITY);

    while running.load(Ordering::SeqCst) {
        let alive = collect_window(results, config.window, &mut batch);

        for frame in batch.drain(..) {
            process_frame(&frame, producer);
        }

        if !alive {
            break;
        }
        thread::sleep(config.pause);
    }

    running.store(false, Ordering::SeqCst);
}
