//! Output scheduler - owns the track table and drives both output channels
//!
//! Every applied observation is emitted right away on the immediate channel.
//! The throttled channel gets the most recent snapshot at most once per
//! interval, followed by the operator line after a short delay.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::decoder::Observation;
use crate::handoff::Consumer;
use crate::record::TelemetryRecord;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::uav_tracker::TrackTable;

use super::format::{self, MeshFormat};
use super::sink::LineSink;

const HEARTBEAT_MESSAGE: &str = "Device is active and scanning.";

/// Throttled channel settings
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    pub interval: Duration,
    pub pilot_delay: Duration,
    pub format: MeshFormat,
    pub max_message: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            pilot_delay: Duration::from_millis(1000),
            format: MeshFormat::Text,
            max_message: format::DEFAULT_MESH_MAX_MESSAGE,
        }
    }
}

#[derive(Serialize)]
struct Heartbeat<'a> {
    heartbeat: &'a str,
    tracked: usize,
    #[serde(flatten)]
    counters: StatsSnapshot,
}

/// Output task state
pub struct OutputScheduler<I: LineSink, M: LineSink> {
    table: TrackTable,
    immediate: I,
    mesh: M,
    throttle: ThrottleConfig,
    stats: Arc<PipelineStats>,
    /// Most recent snapshot and whether it arrived after the last throttled send
    latest: Option<TelemetryRecord>,
    has_latest: bool,
    last_mesh_send: Option<Instant>,
    pending_pilot: Option<(Instant, String)>,
}

impl<I: LineSink, M: LineSink> OutputScheduler<I, M> {
    pub fn new(
        table: TrackTable,
        immediate: I,
        mesh: M,
        throttle: ThrottleConfig,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            table,
            immediate,
            mesh,
            throttle,
            stats,
            latest: None,
            has_latest: false,
            last_mesh_send: None,
            pending_pilot: None,
        }
    }

    /// Drain everything queued, then run the timers
    pub fn run_once(&mut self, queue: &Consumer, now: Instant) {
        while let Some(obs) = queue.poll() {
            self.handle(&obs);
        }
        self.tick(now);
    }

    /// Apply one observation and emit its snapshot on the immediate channel
    pub fn handle(&mut self, obs: &Observation) {
        // All-zero marks an empty slot and can never key a track
        if obs.mac.is_zero() {
            debug!("Ignoring {:?} observation without a source address", obs.family);
            return;
        }
        let (slot, record) = self.table.apply(obs);
        if slot.evicted {
            self.stats.record_eviction();
        }
        let snapshot = record.clone();

        let line = format::immediate_json(&snapshot);
        if send(&mut self.immediate, &line, &self.stats) {
            self.stats.record_emitted();
            self.table.mark_emitted(slot.index);
            if let Err(e) = self.immediate.flush() {
                warn!("Failed to flush immediate channel: {}", e);
            }
        }

        self.latest = Some(snapshot);
        self.has_latest = true;
    }

    /// Throttled send and pending operator line
    pub fn tick(&mut self, now: Instant) {
        let due = self
            .last_mesh_send
            .map_or(true, |last| now.duration_since(last) >= self.throttle.interval);

        if due && self.has_latest {
            if let Some(rec) = &self.latest {
                let drone = format::drone_line(rec, self.throttle.format, self.throttle.max_message);
                if send(&mut self.mesh, &drone, &self.stats) {
                    self.stats.record_mesh_sent();
                }
                self.pending_pilot =
                    format::pilot_line(rec, self.throttle.format, self.throttle.max_message)
                        .map(|line| (now + self.throttle.pilot_delay, line));
            }
            self.last_mesh_send = Some(now);
            self.has_latest = false;
        }

        if let Some((at, _)) = &self.pending_pilot {
            if now >= *at {
                if let Some((_, line)) = self.pending_pilot.take() {
                    if send(&mut self.mesh, &line, &self.stats) {
                        self.stats.record_mesh_sent();
                    }
                }
            }
        }

        if let Err(e) = self.mesh.flush() {
            warn!("Failed to flush throttled channel: {}", e);
        }
    }

    /// Emit the diagnostic heartbeat on the immediate channel
    pub fn heartbeat(&mut self) {
        let heartbeat = Heartbeat {
            heartbeat: HEARTBEAT_MESSAGE,
            tracked: self.table.count(),
            counters: self.stats.snapshot(),
        };
        match serde_json::to_string(&heartbeat) {
            Ok(line) => {
                if send(&mut self.immediate, &line, &self.stats) {
                    if let Err(e) = self.immediate.flush() {
                        warn!("Failed to flush immediate channel: {}", e);
                    }
                }
            }
            Err(e) => warn!("Failed to serialize heartbeat: {}", e),
        }
        info!("[Tracker] {} | {}", self.table.stats_summary(), heartbeat.counters);
    }

    #[cfg(test)]
    pub fn table(&self) -> &TrackTable {
        &self.table
    }

    #[cfg(test)]
    pub fn immediate_sink(&self) -> &I {
        &self.immediate
    }

    #[cfg(test)]
    pub fn mesh_sink(&self) -> &M {
        &self.mesh
    }
}

/// Capacity pre-checked write. A line that does not fit is skipped and counted.
fn send<S: LineSink>(sink: &mut S, line: &str, stats: &PipelineStats) -> bool {
    if sink.available_for_write() < line.len() + 1 {
        debug!("Output buffer full, skipping {} byte line", line.len());
        stats.record_output_skip();
        return false;
    }
    match sink.write_line(line) {
        Ok(()) => true,
        Err(e) => {
            debug!("Output write skipped: {}", e);
            stats.record_output_skip();
            false
        }
    }
}
