//! Wi-Fi capture: monitor-mode sniffer output (or stdin replay)

use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::handoff::Producer;

use super::line::parse_wifi_line;
use super::{kill_helper, process_frame, spawn_helper, HelperHandle};

/// Wi-Fi capture controller
pub struct WifiCapture {
    command: Option<String>,
    running: Arc<AtomicBool>,
    helper: HelperHandle,
}

impl WifiCapture {
    /// `None` reads frame lines from stdin
    pub fn new(command: Option<String>) -> Self {
        Self {
            command,
            running: Arc::new(AtomicBool::new(false)),
            helper: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the capture thread
    pub fn start(&mut self, producer: Producer) -> Result<()> {
        let reader: Box<dyn BufRead + Send> = match &self.command {
            Some(cmd) => {
                let (helper, stdout) = spawn_helper(cmd, "wifi")?;
                self.helper = helper;
                Box::new(BufReader::new(stdout))
            }
            None => {
                info!("No Wi-Fi capture command, reading frames from stdin");
                Box::new(BufReader::new(io::stdin()))
            }
        };

        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);

        thread::Builder::new()
            .name("wifi-capture".to_string())
            .spawn(move || {
                if let Err(e) = run_capture(reader, &running, &producer) {
                    error!("Wi-Fi capture error: {}", e);
                }
                running.store(false, Ordering::SeqCst);
            })
            .context("Failed to spawn Wi-Fi capture thread")?;

        Ok(())
    }

    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Stopping Wi-Fi capture...");
        }
        kill_helper(&self.helper);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for WifiCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Capture loop: one line is one promiscuous-mode callback delivery
pub(crate) fn run_capture<R: BufRead>(
    reader: R,
    running: &AtomicBool,
    producer: &Producer,
) -> Result<()> {
    let stats = producer.stats();
    let mut first_frame = true;

    for line in reader.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let line = line.context("Failed to read Wi-Fi capture line")?;

        match parse_wifi_line(&line) {
            Ok(Some(frame)) => {
                if first_frame {
                    info!("First Wi-Fi frame received ({} bytes)", frame.payload.len());
                    first_frame = false;
                }
                process_frame(&frame, producer);
            }
            Ok(None) => {}
            Err(e) => {
                stats.record_unparsable();
                debug!("Failed to parse Wi-Fi line: {}", e);
            }
        }
    }

    if running.load(Ordering::SeqCst) {
        warn!("Wi-Fi capture input closed (EOF)");
    }
    info!("Wi-Fi capture stopped: {}", stats.snapshot());
    Ok(())
}
