//! Capture sources - helper processes feeding frames into the pipeline
//!
//! Each source reads one captured frame per text line, classifies and decodes
//! it on its own thread and offers the resulting observation to the handoff
//! queue.

mod ble;
pub mod line;
mod wifi;

pub use ble::{BleCapture, BleScanConfig};
pub use wifi::WifiCapture;

use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use tracing::{info, trace};

use crate::decoder::{self, RawFrame};
use crate::handoff::Producer;

/// Running helper process, shared so `stop` can kill it and unblock the reader
pub(crate) type HelperHandle = Arc<Mutex<Option<Child>>>;

/// Spawn a helper command through the shell with piped stdout.
///
/// Helper stderr is forwarded to the log.
pub(crate) fn spawn_helper(command: &str, name: &'static str) -> Result<(HelperHandle, ChildStdout)> {
    info!("Executing {}: {}", name, command);

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn {name} helper: {command}"))?;

    let stdout = child
        .stdout
        .take()
        .with_context(|| format!("Failed to capture {name} stdout"))?;

    if let Some(stderr) = child.stderr.take() {
        thread::Builder::new()
            .name(format!("{name}-stderr"))
            .spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if !line.trim().is_empty() {
                        info!("[{}] {}", name, line.trim());
                    }
                }
            })
            .context("Failed to spawn stderr reader thread")?;
    }

    Ok((Arc::new(Mutex::new(Some(child))), stdout))
}

/// Kill the helper if it is still running
pub(crate) fn kill_helper(handle: &HelperHandle) {
    if let Ok(mut guard) = handle.lock() {
        if let Some(mut child) = guard.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Decode one frame and offer it to the queue.
///
/// Returns true if an observation was queued.
pub(crate) fn process_frame(frame: &RawFrame, producer: &Producer) -> bool {
    let stats = producer.stats();
    stats.record_frame();

    match decoder::decode_frame(frame, chrono::Utc::now().timestamp_millis()) {
        Ok(Some(obs)) => {
            trace!("{:?} observation from {} ({} messages)", obs.family, obs.mac, obs.messages.len());
            producer.offer(obs)
        }
        Ok(None) => false,
        Err(e) => {
            trace!("Dropping {:?} frame: {}", frame.kind, e);
            stats.record_frame_error(&e);
            false
        }
    }
}
