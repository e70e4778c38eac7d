//! Bounded, thread-safe FIFO between any two participants.
//!
//! Grounded in the bounded `ArrayQueue<Fill>` pending-fills pattern used for
//! simulated execution: push never blocks, overflow is counted and logged
//! rather than propagated as an error.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Mailbox<T> {
    queue: ArrayQueue<T>,
    dropped: AtomicU64,
    label: &'static str,
}

impl<T> Mailbox<T> {
    pub fn new(capacity: usize, label: &'static str) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            dropped: AtomicU64::new(0),
            label,
        }
    }

    /// Never blocks. If the queue is full the oldest item is dropped to make
    /// room, and the overflow counter is bumped.
    pub fn push(&self, item: T) {
        if let Err(item) = self.queue.push(item) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            let dropped = self.dropped.load(Ordering::Relaxed);
            if dropped % 100 == 1 {
                tracing::warn!(mailbox = self.label, dropped, "mailbox overflow, dropping oldest");
            }
            if self.queue.pop().is_some() {
                let _ = self.queue.push(item);
            }
        }
    }

    pub fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drain up to `budget` items, in FIFO order, calling `f` on each.
    /// Returns the number actually processed. Grounds §4.7/§4.6's
    /// `MAX_PROCESSED_MESSAGES_PER_FLUSH` budgets.
    pub fn drain_budgeted(&self, budget: usize, mut f: impl FnMut(T)) -> usize {
        let mut processed = 0;
        while processed < budget {
            match self.pop() {
                Some(item) => {
                    f(item);
                    processed += 1;
                }
                None => break,
            }
        }
        if processed == budget && !self.is_empty() {
            tracing::warn!(
                mailbox = self.label,
                remaining = self.len(),
                "message budget exhausted, deferring remainder to next tick"
            );
        }
        processed
    }
}
