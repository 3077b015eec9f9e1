//! The worker cycle: claim a block index, wait for its slot to free up,
//! generate keystream into it outside the ring lock, publish.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::cipher::Cipher;
use crate::constants::BLOCK_SIZE;
use crate::ring::RingBuffer;
use crate::stats::WorkerStats;

/// Calls [`RingBuffer::shutdown`] when dropped. Held for the duration of
/// [`run_worker`]'s loop so that *any* unwind out of the loop — not just
/// the one hand-picked nonce-exhaustion panic below, but also a cipher's
/// own `assert_eq!` on key/nonce length or a panic from inside the
/// `aegis`/`chacha20` crates — still flips `quit` before the thread dies.
/// Without this, a worker that panics after claiming a block but before
/// publishing leaves that block's slot permanently `ready=false`: a later
/// worker claiming a block that maps to the same slot sees it as already
/// free and publishes straight into it, so the consumer silently accepts
/// the wrong block's keystream (or, if no later block ever claims that
/// slot, blocks forever).
struct ShutdownOnUnwind<'a>(&'a RingBuffer);

impl Drop for ShutdownOnUnwind<'_> {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

/// Run one worker's claim/wait/generate/publish loop until the ring
/// shuts down. Returns the worker's accumulated stats.
///
/// Panics (rather than returning an error) if the block index space is
/// exhausted: nonce-space exhaustion at 2^64 blocks has no sensible
/// recovery and is treated as an internal failure. The pipeline
/// orchestrator observes this the same
/// way it observes any other worker panic: the [`ShutdownOnUnwind`] guard
/// below ensures `quit` is set by the time the panic unwinds, and the
/// join is converted into a structured `PipelineError::Internal`.
pub fn run_worker(
    worker_id: usize,
    ring: &RingBuffer,
    blkno: &Mutex<u64>,
    key: &[u8],
    cipher: &dyn Cipher,
) -> WorkerStats {
    let _shutdown_on_unwind = ShutdownOnUnwind(ring);
    let mut stats = WorkerStats::new(worker_id);

    loop {
        if ring.is_quit() {
            break;
        }

        let claim_start = Instant::now();
        let block = claim_next(blkno);
        stats.claim_time += claim_start.elapsed();

        if block == u64::MAX {
            panic!("block index {block} exhausts the 64-bit nonce space");
        }

        let slot = ring.slot_for(block);

        let wait_start = Instant::now();
        if !ring.wait_for_space(slot) {
            break;
        }
        stats.wait_for_space_time += wait_start.elapsed();
        stats.wait_cycles += 1;

        let nonce = cipher.nonce_for_block(block);
        let crypto_start = Instant::now();
        cipher.stream(key, &nonce, BLOCK_SIZE, ring.slot_mut(slot));
        stats.crypto_time += crypto_start.elapsed();
        stats.blocks_generated += 1;

        ring.publish(slot);
    }

    stats
}

/// Step 1: claim the next block index under the dedicated claim mutex.
/// Kept separate from the ring mutex so claims — a bare
/// load-and-increment — never contend with the larger readiness
/// critical sections.
fn claim_next(blkno: &Mutex<u64>) -> u64 {
    let mut guard = blkno.lock();
    let block = *guard;
    *guard = guard.wrapping_add(1);
    block
}

/// Spawn `n` worker threads sharing one ring, claim mutex, key, and
/// cipher. Returns their join handles; the caller is responsible for
/// joining and translating panics into structured errors.
pub fn spawn_workers(
    n: usize,
    ring: Arc<RingBuffer>,
    blkno: Arc<Mutex<u64>>,
    key: Arc<Vec<u8>>,
    cipher: Arc<dyn Cipher>,
) -> Vec<std::thread::JoinHandle<WorkerStats>> {
    (0..n)
        .map(|worker_id| {
            let ring = Arc::clone(&ring);
            let blkno = Arc::clone(&blkno);
            let key = Arc::clone(&key);
            let cipher = Arc::clone(&cipher);
            std::thread::Builder::new()
                .name(format!("randquik-worker-{worker_id}"))
                .spawn(move || run_worker(worker_id, &ring, &blkno, &key, cipher.as_ref()))
                .expect("failed to spawn worker thread")
        })
        .collect()
}
