//! The consumer: drains ready slots in block-index order to the output
//! fd. Runs on the calling thread, not a spawned one.

use std::time::Instant;

use crate::constants::BLOCK_SIZE;
use crate::error::PipelineError;
use crate::output::OutputSink;
use crate::ring::RingBuffer;
use crate::stats::ConsumerStats;

/// What the consumer produced: how much it wrote, whether it stopped
/// early, and (on a hard I/O failure) the error to surface — kept out of
/// `Result` so the orchestrator always gets the prefix byte count back,
/// even on failure.
pub struct ConsumerOutcome {
    pub written: u64,
    pub interrupted: bool,
    pub error: Option<PipelineError>,
    pub stats: ConsumerStats,
}

/// Drain the ring starting at `start_block`, writing `total` bytes (or
/// forever, if `total` is `None`) to `output`, skipping the partial head
/// implied by `start_offset` (`start_offset = iseek mod BLOCK_SIZE`).
/// `on_progress` is called after every block with the cumulative bytes
/// written so far.
#[allow(clippy::too_many_arguments)]
pub fn run_consumer(
    ring: &RingBuffer,
    start_block: u64,
    start_offset: usize,
    total: Option<u64>,
    dry: bool,
    output: &mut OutputSink,
    mut on_progress: impl FnMut(u64),
) -> ConsumerOutcome {
    let mut stats = ConsumerStats::default();
    let mut written = 0u64;
    let mut conpos = start_block;
    let mut slot = ring.slot_for(conpos);

    let wait_start = Instant::now();
    if !ring.wait_for_data(slot) {
        return ConsumerOutcome {
            written,
            interrupted: true,
            error: None,
            stats,
        };
    }
    stats.wait_for_data_time += wait_start.elapsed();

    let remaining = |written: u64| total.map(|t| t.saturating_sub(written));
    let head_budget = (BLOCK_SIZE - start_offset) as u64;
    let first_len = match remaining(0) {
        Some(r) => head_budget.min(r),
        None => head_budget,
    } as usize;

    if let Some(err) = write_block(
        output,
        &ring.slot(slot)[start_offset..start_offset + first_len],
        dry,
        &mut stats,
    ) {
        ring.shutdown();
        return ConsumerOutcome {
            written,
            interrupted: true,
            error: Some(err),
            stats,
        };
    }
    written += first_len as u64;
    stats.blocks_consumed += 1;
    on_progress(written);

    loop {
        if let Some(total) = total {
            if written >= total {
                break;
            }
        }
        if ring.is_quit() {
            return ConsumerOutcome {
                written,
                interrupted: true,
                error: None,
                stats,
            };
        }

        ring.free(slot);
        conpos += 1;
        slot = ring.slot_for(conpos);

        let wait_start = Instant::now();
        if !ring.wait_for_data(slot) {
            return ConsumerOutcome {
                written,
                interrupted: true,
                error: None,
                stats,
            };
        }
        stats.wait_for_data_time += wait_start.elapsed();

        let len = match remaining(written) {
            Some(r) => (BLOCK_SIZE as u64).min(r),
            None => BLOCK_SIZE as u64,
        } as usize;

        if let Some(err) = write_block(output, &ring.slot(slot)[..len], dry, &mut stats) {
            ring.shutdown();
            return ConsumerOutcome {
                written,
                interrupted: true,
                error: Some(err),
                stats,
            };
        }
        written += len as u64;
        stats.blocks_consumed += 1;
        on_progress(written);
    }

    ring.free(slot);

    ConsumerOutcome {
        written,
        interrupted: false,
        error: None,
        stats,
    }
}

fn write_block(
    output: &mut OutputSink,
    buf: &[u8],
    dry: bool,
    stats: &mut ConsumerStats,
) -> Option<PipelineError> {
    if dry || buf.is_empty() {
        return None;
    }
    let write_start = Instant::now();
    let result = output.write_all(buf);
    stats.write_time += write_start.elapsed();
    match result {
        Ok(()) => None,
        Err(e) => {
            output.unlink_if_created();
            Some(PipelineError::io_write(output.display_path(), e))
        }
    }
}
