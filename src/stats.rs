//! Pipeline counters shared between capture threads and the output task

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::decoder::FrameError;

/// Lock-free counters for every best-effort drop point in the pipeline
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub frames_received: AtomicU64,
    pub unparsable_lines: AtomicU64,
    pub malformed_frames: AtomicU64,
    pub decode_rejected: AtomicU64,
    pub observations_queued: AtomicU64,
    pub queue_drops: AtomicU64,
    pub evictions: AtomicU64,
    pub records_emitted: AtomicU64,
    pub mesh_sent: AtomicU64,
    pub output_skips: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unparsable(&self) {
        self.unparsable_lines.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a decoder failure under its taxonomy bucket
    pub fn record_frame_error(&self, err: &FrameError) {
        if err.is_malformed() {
            self.malformed_frames.fetch_add(1, Ordering::Relaxed);
        } else {
            self.decode_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_queued(&self) {
        self.observations_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_drop(&self) {
        self.queue_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_emitted(&self) {
        self.records_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mesh_sent(&self) {
        self.mesh_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_output_skip(&self) {
        self.output_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            frames_received: get(&self.frames_received),
            unparsable_lines: get(&self.unparsable_lines),
            malformed_frames: get(&self.malformed_frames),
            decode_rejected: get(&self.decode_rejected),
            observations_queued: get(&self.observations_queued),
            queue_drops: get(&self.queue_drops),
            evictions: get(&self.evictions),
            records_emitted: get(&self.records_emitted),
            mesh_sent: get(&self.mesh_sent),
            output_skips: get(&self.output_skips),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    pub unparsable_lines: u64,
    pub malformed_frames: u64,
    pub decode_rejected: u64,
    pub observations_queued: u64,
    pub queue_drops: u64,
    pub evictions: u64,
    pub records_emitted: u64,
    pub mesh_sent: u64,
    pub output_skips: u64,
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "frames={} queued={} dropped={} malformed={} rejected={} emitted={} mesh={} skipped={}",
            self.frames_received,
            self.observations_queued,
            self.queue_drops,
            self.malformed_frames,
            self.decode_rejected,
            self.records_emitted,
            self.mesh_sent,
            self.output_skips
        )
    }
}
