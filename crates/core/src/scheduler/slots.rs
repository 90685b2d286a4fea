//! Slot accounting for concurrently running jobs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::metrics;

/// Tracks how many of a fixed number of execution slots are occupied.
///
/// Invariant: `occupied <= capacity` at every instant. Capacity is fixed for
/// the lifetime of the pool and is at least 1.
#[derive(Debug)]
pub struct SlotPool {
    capacity: usize,
    occupied: AtomicUsize,
    peak: AtomicUsize,
    released: Notify,
}

/// An occupied slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct SlotPermit {
    pool: Arc<SlotPool>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.pool.release();
    }
}

impl SlotPool {
    /// Creates a pool with `capacity` slots (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        metrics::SLOT_CAPACITY.set(capacity as i64);
        Self {
            capacity,
            occupied: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            released: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn occupied(&self) -> usize {
        self.occupied.load(Ordering::Acquire)
    }

    pub fn available(&self) -> usize {
        self.capacity - self.occupied()
    }

    /// Highest occupancy observed since the pool was created.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Occupies a slot if one is free. Never blocks.
    pub fn try_reserve(&self) -> bool {
        let reserved = self
            .occupied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            });

        match reserved {
            Ok(previous) => {
                self.peak.fetch_max(previous + 1, Ordering::AcqRel);
                metrics::SLOTS_OCCUPIED.inc();
                true
            }
            Err(_) => false,
        }
    }

    /// Frees a slot and wakes any dispatcher waiting for one.
    ///
    /// # Panics
    ///
    /// Panics if no slot is occupied; that is a caller bug, not a runtime
    /// condition.
    pub fn release(&self) {
        if self
            .occupied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_err()
        {
            panic!("slot pool released with no occupied slots");
        }
        metrics::SLOTS_OCCUPIED.dec();
        self.released.notify_waiters();
    }

    /// Occupies a slot if one is free, returning a permit that releases it on drop.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SlotPermit> {
        self.try_reserve().then(|| SlotPermit {
            pool: Arc::clone(self),
        })
    }

    /// Waits until a slot is free.
    ///
    /// Wakes as soon as a slot is released, and re-checks at least every
    /// `poll_interval`. Returns `None` once `cancel` fires.
    pub async fn acquire(
        self: &Arc<Self>,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> Option<SlotPermit> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }

            // Register for wake-ups before checking, so a release between the
            // check and the wait is not missed.
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(permit) = self.try_acquire() {
                return Some(permit);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = &mut notified => {}
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
}
