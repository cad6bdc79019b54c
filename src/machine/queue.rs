//! Pending-trigger queue and the single-writer drain gate.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// Bounded FIFO of triggers waiting to be processed.
///
/// Unlike the drain gate this is not lock-free: `is_queued` scans the
/// contents, which a lock-free queue cannot offer. The lock is taken for a
/// single push, pop or scan and is never held while user callbacks run, so
/// a callback that fires back into the machine on the draining thread
/// cannot contend with itself.
pub(crate) struct PendingQueue<T> {
    items: Mutex<VecDeque<T>>,
    limit: usize,
}

impl<T: PartialEq> PendingQueue<T> {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(limit)),
            limit,
        }
    }

    /// Append `trigger`, handing it back if the queue already holds
    /// `limit` or more entries.
    pub(crate) fn push(&self, trigger: T) -> Result<(), T> {
        let mut items = self.items.lock();
        if items.len() >= self.limit {
            return Err(trigger);
        }
        items.push_back(trigger);
        Ok(())
    }

    pub(crate) fn pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    pub(crate) fn contains(&self, trigger: &T) -> bool {
        self.items.lock().contains(trigger)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub(crate) fn limit(&self) -> usize {
        self.limit
    }
}

/// Try-lock deciding which caller drains the queue.
///
/// Acquisition never blocks: a caller that loses the race returns and
/// leaves its trigger to the current holder.
#[derive(Default)]
pub(crate) struct DrainGate {
    busy: AtomicBool,
}

impl DrainGate {
    pub(crate) fn try_acquire(&self) -> Option<GateGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| GateGuard { gate: self })
    }
}

/// Releases the gate when dropped, including during a panic unwinding out
/// of a callback.
pub(crate) struct GateGuard<'a> {
    gate: &'a DrainGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}
