//! Bounded hand-off between ingestion tasks and the simulation tick
//!
//! Push never blocks on a full queue: the oldest entry is evicted and the
//! drop counter incremented. Drain takes everything queued in one short
//! critical section.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::event::Event;

/// Result of a single push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Accepted,
    /// Accepted after evicting the oldest queued event
    DroppedOldest,
}

#[derive(Debug)]
pub struct TransferQueue {
    inner: Mutex<VecDeque<Event>>,
    capacity: usize,
    dropped: AtomicU64,
    accepted: AtomicU64,
}

impl TransferQueue {
    /// Create a queue holding at most `capacity` events (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
        }
    }

    // A panicking holder cannot leave the deque half-modified, so the data is
    // still usable after poisoning.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Event>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, event: Event) -> PushOutcome {
        let evicted = {
            let mut queue = self.lock();
            let evicted = if queue.len() >= self.capacity {
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(event);
            evicted
        };
        self.accepted.fetch_add(1, Ordering::Relaxed);

        match evicted {
            Some(old) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    kind = %old.kind(),
                    agent_id = old.agent_id(),
                    total_dropped = total,
                    "Transfer queue full, dropped oldest event"
                );
                PushOutcome::DroppedOldest
            }
            None => PushOutcome::Accepted,
        }
    }

    /// Take every queued event in FIFO order; never blocks on an empty queue
    pub fn drain(&self) -> Vec<Event> {
        let mut queue = self.lock();
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events evicted by overflow since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Events pushed since creation, including ones later evicted
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn ev(n: usize) -> Event {
        Event::agent_working(&format!("a{}", n), n as f64)
    }

    #[test]
    fn test_fifo_order() {
        let queue = TransferQueue::new(10);
        for i in 0..5 {
            assert_eq!(queue.push(ev(i)), PushOutcome::Accepted);
        }
        let drained: Vec<_> = queue.drain().iter().map(|e| e.agent_id().to_string()).collect();
        assert_eq!(drained, vec!["a0", "a1", "a2", "a3", "a4"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let queue = TransferQueue::new(3);
        for i in 0..3 {
            queue.push(ev(i));
        }
        assert_eq!(queue.push(ev(3)), PushOutcome::DroppedOldest);
        assert_eq!(queue.push(ev(4)), PushOutcome::DroppedOldest);
        assert_eq!(queue.dropped(), 2);
        assert_eq!(queue.accepted(), 5);

        let ids: Vec<_> = queue.drain().iter().map(|e| e.agent_id().to_string()).collect();
        assert_eq!(ids, vec!["a2", "a3", "a4"]);
    }

    #[test]
    fn test_drain_empty_is_noop() {
        let queue = TransferQueue::new(4);
        assert!(queue.drain().is_empty());
        assert_eq!(queue.dropped(), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let queue = TransferQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.push(ev(0));
        queue.push(ev(1));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain()[0].agent_id(), "a1");
    }

    #[test]
    fn test_concurrent_writers_keep_per_writer_order() {
        let queue = Arc::new(TransferQueue::new(10_000));
        let handles: Vec<_> = (0..4)
            .map(|w| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..500 {
                        queue.push(Event::agent_working(&format!("w{}", w), i as f64));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let drained = queue.drain();
        assert_eq!(drained.len(), 2000);
        for w in 0..4 {
            let id = format!("w{}", w);
            let stamps: Vec<f64> = drained
                .iter()
                .filter(|e| e.agent_id() == id)
                .map(|e| e.timestamp())
                .collect();
            assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }
}
