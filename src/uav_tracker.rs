//! Aircraft track table
//!
//! Fixed set of per-aircraft slots keyed by hardware address. Partial updates
//! from different broadcast messages accumulate into one record per aircraft.
//! The table is owned by the output task; capture threads only ever hand it
//! observations through the queue.

use std::str::FromStr;

use tracing::{debug, info};

use crate::decoder::Observation;
use crate::record::{MacAddr, TelemetryRecord};

/// Default number of tracked aircraft
pub const DEFAULT_CAPACITY: usize = 8;

/// Position update threshold for logging
const POSITION_LOG_INTERVAL_MS: i64 = 5_000;

/// Which slot is reused when a new aircraft shows up and the table is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Always overwrite slot 0
    #[default]
    FirstSlot,
    /// Overwrite the slot with the oldest last-seen time
    LeastRecent,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first-slot" | "first" => Ok(EvictionPolicy::FirstSlot),
            "least-recent" | "lru" => Ok(EvictionPolicy::LeastRecent),
            other => Err(format!("unknown eviction policy: {other}")),
        }
    }
}

/// Result of a slot lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub index: usize,
    /// The slot belonged to a different aircraft and was reset
    pub evicted: bool,
}

/// Fixed-capacity track table with linear lookup
pub struct TrackTable {
    slots: Vec<TelemetryRecord>,
    policy: EvictionPolicy,
    /// Last time a position was logged per slot, for rate limiting
    position_logged_ms: Vec<i64>,
}

impl TrackTable {
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![TelemetryRecord::default(); capacity],
            policy,
            position_logged_ms: vec![i64::MIN; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Exact match, else first empty slot, else the eviction victim.
    ///
    /// An evicted slot is cleared here so the new aircraft never inherits
    /// fields of the previous one.
    pub fn find_or_allocate(&mut self, mac: MacAddr) -> Slot {
        if let Some(index) = self.slots.iter().position(|r| r.mac == mac && !mac.is_zero()) {
            return Slot {
                index,
                evicted: false,
            };
        }

        if let Some(index) = self.slots.iter().position(|r| r.mac.is_zero()) {
            debug!("New aircraft tracked: {} in slot {}", mac, index);
            self.slots[index] = TelemetryRecord::new(mac);
            return Slot {
                index,
                evicted: false,
            };
        }

        let index = self.victim();
        debug!(
            "Track table full, {} replaces {} in slot {}",
            mac, self.slots[index].mac, index
        );
        self.slots[index] = TelemetryRecord::new(mac);
        self.position_logged_ms[index] = i64::MIN;
        Slot {
            index,
            evicted: true,
        }
    }

    fn victim(&self) -> usize {
        match self.policy {
            EvictionPolicy::FirstSlot => 0,
            EvictionPolicy::LeastRecent => self
                .slots
                .iter()
                .enumerate()
                .min_by_key(|(_, r)| r.last_seen_ms)
                .map(|(i, _)| i)
                .unwrap_or(0),
        }
    }

    /// Merge an observation into a slot and mark the record fresh
    pub fn upsert(&mut self, slot: usize, obs: &Observation) -> &TelemetryRecord {
        let had_position = self.slots[slot].has_position();
        let record = &mut self.slots[slot];

        for msg in &obs.messages {
            record.merge(msg);
        }
        record.mac = obs.mac;
        record.rssi = obs.rssi;
        record.last_seen_ms = obs.seen_ms;
        record.fresh = true;

        if record.has_position()
            && (!had_position
                || obs.seen_ms.saturating_sub(self.position_logged_ms[slot])
                    >= POSITION_LOG_INTERVAL_MS)
        {
            self.position_logged_ms[slot] = obs.seen_ms;
            info!(
                "UAV {} {} at ({:.5}, {:.5}) alt={} spd={} hdg={} rssi={}",
                record.mac,
                if record.uav_id.is_empty() {
                    "-".to_string()
                } else {
                    record.uav_id.to_string_lossy()
                },
                record.latitude,
                record.longitude,
                record.altitude_msl,
                record.speed,
                record.heading,
                record.rssi
            );
        }

        &self.slots[slot]
    }

    /// Look up and update in one step. Returns the slot used and the updated record.
    pub fn apply(&mut self, obs: &Observation) -> (Slot, &TelemetryRecord) {
        let slot = self.find_or_allocate(obs.mac);
        (slot, self.upsert(slot.index, obs))
    }

    /// Clear the freshness flag once a record has been emitted
    pub fn mark_emitted(&mut self, slot: usize) {
        if let Some(record) = self.slots.get_mut(slot) {
            record.fresh = false;
        }
    }

    #[cfg(test)]
    pub fn get(&self, mac: MacAddr) -> Option<&TelemetryRecord> {
        self.occupied().find(|r| r.mac == mac)
    }

    /// Records of all occupied slots, in slot order
    pub fn occupied(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.slots.iter().filter(|r| !r.mac.is_zero())
    }

    pub fn count(&self) -> usize {
        self.occupied().count()
    }

    pub fn stats_summary(&self) -> TrackerStats {
        TrackerStats {
            tracked: self.count(),
            with_position: self.occupied().filter(|r| r.has_position()).count(),
            with_id: self.occupied().filter(|r| !r.uav_id.is_empty()).count(),
            capacity: self.capacity(),
        }
    }
}

/// Tracker statistics
#[derive(Debug, Clone)]
pub struct TrackerStats {
    pub tracked: usize,
    pub with_position: usize,
    pub with_id: usize,
    pub capacity: usize,
}

impl std::fmt::Display for TrackerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "UAVs: {}/{} tracked, {} with position, {} with ID",
            self.tracked, self.capacity, self.with_position, self.with_id
        )
    }
}
