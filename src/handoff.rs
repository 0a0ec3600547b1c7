//! Capture-to-output handoff
//!
//! Bounded queue between capture threads and the output task. Producers never
//! block: when the queue is full the new observation is dropped and counted.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use tracing::trace;

use crate::decoder::Observation;
use crate::stats::PipelineStats;

/// Create a queue with the given capacity
pub fn channel(capacity: usize, stats: Arc<PipelineStats>) -> (Producer, Consumer) {
    let (tx, rx) = bounded(capacity.max(1));
    (Producer { tx, stats }, Consumer { rx })
}

/// Capture side of the queue, cloned into each capture thread
#[derive(Clone)]
pub struct Producer {
    tx: Sender<Observation>,
    stats: Arc<PipelineStats>,
}

impl Producer {
    /// Enqueue without blocking. Returns false if the item was dropped.
    pub fn offer(&self, obs: Observation) -> bool {
        match self.tx.try_send(obs) {
            Ok(()) => {
                self.stats.record_queued();
                true
            }
            Err(TrySendError::Full(obs)) => {
                trace!("Handoff queue full, dropping observation from {}", obs.mac);
                self.stats.record_queue_drop();
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.stats.record_queue_drop();
                false
            }
        }
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }
}

/// Output side of the queue
pub struct Consumer {
    rx: Receiver<Observation>,
}

impl Consumer {
    /// Zero-timeout dequeue
    pub fn poll(&self) -> Option<Observation> {
        match self.rx.try_recv() {
            Ok(obs) => Some(obs),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Family;
    use crate::record::MacAddr;

    fn obs(n: u8) -> Observation {
        Observation {
            mac: MacAddr([0, 0, 0, 0, 0, n]),
            rssi: -40,
            seen_ms: n as i64,
            family: Family::BleLegacy,
            messages: Vec::new(),
        }
    }

    #[test]
    fn test_overfill_keeps_capacity_items() {
        let stats = Arc::new(PipelineStats::new());
        let (producer, consumer) = channel(8, stats.clone());

        let accepted = (0..12).filter(|&n| producer.offer(obs(n))).count();
        assert_eq!(accepted, 8);
        assert_eq!(consumer.len(), 8);

        let snap = stats.snapshot();
        assert_eq!(snap.observations_queued, 8);
        assert_eq!(snap.queue_drops, 4);
    }

    #[test]
    fn test_poll_is_fifo_and_non_blocking() {
        let (producer, consumer) = channel(4, Arc::new(PipelineStats::new()));
        assert!(consumer.poll().is_none());

        producer.offer(obs(1));
        producer.offer(obs(2));
        assert_eq!(consumer.poll().map(|o| o.seen_ms), Some(1));
        assert_eq!(consumer.poll().map(|o| o.seen_ms), Some(2));
        assert!(consumer.poll().is_none());
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_offer_from_multiple_threads() {
        let stats = Arc::new(PipelineStats::new());
        let (producer, consumer) = channel(8, stats.clone());

        let handles: Vec<_> = (0..2)
            .map(|t| {
                let producer = producer.clone();
                std::thread::spawn(move || {
                    for n in 0..10 {
                        producer.offer(obs(t * 10 + n));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(consumer.len(), 8);
        assert_eq!(stats.snapshot().queue_drops, 12);
    }
}
