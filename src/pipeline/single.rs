//! The single-threaded fallback: no ring, no synchronization, one buffer
//! generated into and written in place.
//!
//! This path derives nonces the same way the multi-threaded path does —
//! as the little-endian block index — rather than via the cipher's
//! `nonce_increment`, so output matches the multi-threaded path for any
//! `iseek`, not just `iseek == 0`.

use std::time::Instant;

use crate::cipher::Cipher;
use crate::constants::BLOCK_SIZE;
use crate::error::PipelineError;
use crate::output::OutputSink;
use crate::stats::SingleThreadedStats;

/// Outcome of the single-threaded run, mirroring [`super::consumer::ConsumerOutcome`].
pub struct SingleThreadedOutcome {
    pub written: u64,
    pub interrupted: bool,
    pub error: Option<PipelineError>,
    pub stats: SingleThreadedStats,
}

/// Generate and write `total` bytes (or forever, if `None`) starting at
/// logical block `start_block`, skipping `start_offset` bytes of the
/// first block. `quit` is polled between blocks so `stop()` (e.g. from a
/// signal handler) still terminates an infinite run promptly.
#[allow(clippy::too_many_arguments)]
pub fn run_single_threaded(
    key: &[u8],
    cipher: &dyn Cipher,
    start_block: u64,
    start_offset: usize,
    total: Option<u64>,
    dry: bool,
    output: &mut OutputSink,
    quit: &std::sync::atomic::AtomicBool,
    mut on_progress: impl FnMut(u64),
) -> SingleThreadedOutcome {
    use std::sync::atomic::Ordering;

    let mut stats = SingleThreadedStats::default();
    let mut written = 0u64;
    let mut block = start_block;
    let mut buf = vec![0u8; BLOCK_SIZE];
    let mut offset_in_block = start_offset;

    loop {
        if let Some(total) = total {
            if written >= total {
                break;
            }
        }
        if quit.load(Ordering::Relaxed) {
            return SingleThreadedOutcome {
                written,
                interrupted: true,
                error: None,
                stats,
            };
        }

        let nonce = cipher.nonce_for_block(block);
        let crypto_start = Instant::now();
        cipher.stream(key, &nonce, BLOCK_SIZE, &mut buf);
        stats.crypto_time += crypto_start.elapsed();

        let remaining = total.map(|t| t.saturating_sub(written));
        let available = (BLOCK_SIZE - offset_in_block) as u64;
        let len = match remaining {
            Some(r) => available.min(r),
            None => available,
        } as usize;

        if !dry && len > 0 {
            let write_start = Instant::now();
            let result = output.write_all(&buf[offset_in_block..offset_in_block + len]);
            stats.write_time += write_start.elapsed();
            if let Err(e) = result {
                output.unlink_if_created();
                return SingleThreadedOutcome {
                    written,
                    interrupted: true,
                    error: Some(PipelineError::io_write(output.display_path(), e)),
                    stats,
                };
            }
        }

        written += len as u64;
        stats.blocks_processed += 1;
        on_progress(written);

        offset_in_block = 0;
        block += 1;
    }

    SingleThreadedOutcome {
        written,
        interrupted: false,
        error: None,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::ChaCha20;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn zero_total_produces_no_writes() {
        let key = vec![0u8; 32];
        let cipher = ChaCha20::new();
        let mut out = OutputSink::Null;
        let quit = AtomicBool::new(false);
        let outcome = run_single_threaded(
            &key,
            &cipher,
            0,
            0,
            Some(0),
            false,
            &mut out,
            &quit,
            |_| {},
        );
        assert_eq!(outcome.written, 0);
        assert!(!outcome.interrupted);
    }

    #[test]
    fn partial_block_respects_total() {
        let key = vec![0u8; 32];
        let cipher = ChaCha20::new();
        let mut out = OutputSink::Null;
        let quit = AtomicBool::new(false);
        let outcome = run_single_threaded(
            &key,
            &cipher,
            0,
            0,
            Some(100),
            false,
            &mut out,
            &quit,
            |_| {},
        );
        assert_eq!(outcome.written, 100);
    }
}
