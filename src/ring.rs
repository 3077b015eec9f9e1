//! The ring buffer: a fixed-size flat byte region plus a parallel vector
//! of ready flags, guarded by one mutex and two condition variables.
//!
//! The consumer and the workers wake on disjoint events — a slot
//! becoming ready vs. a slot becoming free — so two condvars over one
//! mutex give targeted notification instead of a thundering herd on a
//! single condvar.

use std::cell::UnsafeCell;

use parking_lot::{Condvar, Mutex};

use crate::constants::BLOCK_SIZE;

/// Mutex-guarded bookkeeping shared by every worker and the consumer.
/// The monotonic block counter (`blkno`) is claimed through a separate,
/// smaller mutex (see [`crate::pipeline::claim`]); this struct only
/// covers slot readiness and shutdown.
struct RingState {
    /// `ready[slot]` is true iff the slot holds keystream for the block
    /// index currently assigned to it and the consumer has not yet
    /// drained it.
    ready: Vec<bool>,
    /// Shutdown flag. Set at most once; every wait loop rechecks it on
    /// wakeup.
    quit: bool,
}

/// A fixed-size ring of `num_slots` blocks of `BLOCK_SIZE` bytes each.
///
/// Slot bytes themselves are *not* guarded by the mutex: at any instant
/// each slot is written by at most one worker (the one that claimed the
/// block index currently mapped to it) or read by the consumer, never
/// both. The `ready` flag, which *is* mutex-guarded, is what establishes
/// the happens-before relationship between a worker's write and the
/// consumer's subsequent read of the same bytes.
pub struct RingBuffer {
    /// Flat backing store, `num_slots * BLOCK_SIZE` bytes. `UnsafeCell`
    /// because slot access is partitioned by convention (readiness
    /// protocol below), not by the type system — the tradeoff
    /// `MappedRingBuffer`-style manual `Sync` impls make.
    data: UnsafeCell<Vec<u8>>,
    num_slots: usize,
    state: Mutex<RingState>,
    has_data: Condvar,
    has_space: Condvar,
}

// SAFETY: access to `data` is partitioned by slot index via the
// readiness protocol enforced through `state`; no two threads ever hold
// a live reference to the same slot's bytes at once. `RingBuffer` is
// already `Send` (every field is); only `Sync` needs the manual
// assertion, since `UnsafeCell` never implements it automatically.
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Build a ring with `num_slots` slots of `BLOCK_SIZE` bytes each.
    /// The pipeline sizes this as `workers + 2`: enough slack that a
    /// worker can claim ahead of the consumer without the whole pool
    /// stalling on a single slot.
    pub fn new(num_slots: usize) -> Self {
        assert!(num_slots >= 1, "ring buffer needs at least one slot");
        Self {
            data: UnsafeCell::new(vec![0u8; num_slots * BLOCK_SIZE]),
            num_slots,
            state: Mutex::new(RingState {
                ready: vec![false; num_slots],
                quit: false,
            }),
            has_data: Condvar::new(),
            has_space: Condvar::new(),
        }
    }

    /// Number of slots in the ring.
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Map a block index to its slot.
    pub fn slot_for(&self, block_index: u64) -> usize {
        (block_index % self.num_slots as u64) as usize
    }

    /// Mutable view of a slot's bytes. Caller must hold the readiness
    /// protocol invariant: only the worker that claimed the block
    /// currently mapped to `slot` may call this before publishing, and
    /// only the consumer may call it after the slot becomes ready and
    /// before it is freed.
    #[allow(clippy::mut_from_ref)]
    pub fn slot_mut(&self, slot: usize) -> &mut [u8] {
        let start = slot * BLOCK_SIZE;
        // SAFETY: see partitioning argument on the `Sync`/`Send` impls.
        let data = unsafe { &mut *self.data.get() };
        &mut data[start..start + BLOCK_SIZE]
    }

    /// Read-only view of a slot's bytes.
    pub fn slot(&self, slot: usize) -> &[u8] {
        let start = slot * BLOCK_SIZE;
        // SAFETY: see partitioning argument on the `Sync`/`Send` impls.
        let data = unsafe { &*self.data.get() };
        &data[start..start + BLOCK_SIZE]
    }

    /// Worker step 2: block until `slot` is free (not ready) or the
    /// pipeline quits. Returns `false` if the pipeline quit while
    /// waiting.
    pub fn wait_for_space(&self, slot: usize) -> bool {
        let mut state = self.state.lock();
        while state.ready[slot] && !state.quit {
            self.has_space.wait(&mut state);
        }
        !state.quit
    }

    /// Worker step 4: mark `slot` ready and wake the consumer.
    pub fn publish(&self, slot: usize) {
        let mut state = self.state.lock();
        state.ready[slot] = true;
        self.has_data.notify_one();
    }

    /// Consumer: block until `slot` is ready or the pipeline quits.
    /// Returns `false` if the pipeline quit while waiting.
    pub fn wait_for_data(&self, slot: usize) -> bool {
        let mut state = self.state.lock();
        while !state.ready[slot] && !state.quit {
            self.has_data.wait(&mut state);
        }
        !state.quit
    }

    /// Consumer: mark `slot` consumed (free) and wake every worker that
    /// might be waiting on it — multiple workers can be blocked on
    /// distinct slots, and any one freed slot could be the one any of
    /// them is waiting for, so this wakes all of them rather than one.
    pub fn free(&self, slot: usize) {
        let mut state = self.state.lock();
        state.ready[slot] = false;
        self.has_space.notify_all();
    }

    /// Idempotent shutdown: set `quit` and wake every waiter on both
    /// conditions. May be called from any thread.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.quit {
            return;
        }
        state.quit = true;
        self.has_data.notify_all();
        self.has_space.notify_all();
    }

    /// Whether the pipeline has been told to quit.
    pub fn is_quit(&self) -> bool {
        self.state.lock().quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_for_wraps_modulo_num_slots() {
        let ring = RingBuffer::new(4);
        assert_eq!(ring.slot_for(0), 0);
        assert_eq!(ring.slot_for(3), 3);
        assert_eq!(ring.slot_for(4), 0);
        assert_eq!(ring.slot_for(9), 1);
    }

    #[test]
    fn publish_then_wait_for_data_observes_ready() {
        let ring = RingBuffer::new(2);
        ring.slot_mut(0)[0] = 42;
        ring.publish(0);
        assert!(ring.wait_for_data(0));
        assert_eq!(ring.slot(0)[0], 42);
    }

    #[test]
    fn free_then_wait_for_space_observes_free() {
        let ring = RingBuffer::new(2);
        ring.publish(0);
        ring.free(0);
        assert!(ring.wait_for_space(0));
    }

    #[test]
    fn shutdown_wakes_waiters_as_quit() {
        let ring = RingBuffer::new(1);
        ring.shutdown();
        assert!(!ring.wait_for_data(0));
        assert!(!ring.wait_for_space(0));
        assert!(ring.is_quit());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let ring = RingBuffer::new(1);
        ring.shutdown();
        ring.shutdown();
        assert!(ring.is_quit());
    }
}
