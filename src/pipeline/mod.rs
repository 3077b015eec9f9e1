//! The run orchestrator: opens the fd, wires the progress counter, runs
//! the ring-buffer pipeline or the single-threaded fallback, collects
//! stats, and translates interruption into a structured [`RunResult`].

mod consumer;
mod single;
mod worker;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cipher::Cipher;
use crate::constants::BLOCK_SIZE;
use crate::error::{PipelineError, Result};
use crate::output::{self, OutputSink};
use crate::progress::ProgressDisplay;
use crate::ring::RingBuffer;
use crate::signal::InterruptWatcher;
use crate::size::format_bytes;
use crate::stats::RunStats;

/// Everything the orchestrator needs to run one pipeline from start to
/// finish. Constructed by the CLI layer (or the benchmark driver) from
/// already-validated inputs — no parsing happens here.
pub struct PipelineConfig {
    /// The derived key, already sized to `cipher.key_bytes()`.
    pub key: Vec<u8>,
    /// The selected cipher.
    pub cipher: Arc<dyn Cipher>,
    /// Worker count. `0` selects the single-threaded fallback.
    pub workers: usize,
    /// Total bytes to produce. `None` means infinite.
    pub total: Option<u64>,
    /// Logical keystream start offset (affects the nonce).
    pub iseek: u64,
    /// Output fd start offset (affects where bytes land on disk).
    pub oseek: u64,
    /// Output path. `None` or `Some("-")` means stdout.
    pub output_path: Option<String>,
    /// Skip all writes; still runs crypto and synchronization.
    pub dry: bool,
    /// Suppress the progress display.
    pub quiet: bool,
}

/// Outcome of one run, returned on both normal completion and graceful
/// abort — `DONE` and `ABORTED` in the pipeline state machine both
/// produce one of these rather than diverging error types.
pub struct RunResult {
    /// Bytes actually written (or generated, in dry mode).
    pub written: u64,
    /// Wall-clock time for the run.
    pub elapsed: Duration,
    /// Whether the run ended early (interruption, a worker panic, or a
    /// write failure) rather than reaching `total`.
    pub interrupted: bool,
    /// Set only for a hard failure mid-run (`IoWrite`/`Internal`); a
    /// plain user interruption leaves this `None` even though
    /// `interrupted` is `true`.
    pub error: Option<PipelineError>,
    /// `"wrote"` normally, `"generated"` in dry-run mode — used in the
    /// human-readable summary.
    pub action: &'static str,
    /// Per-worker or single-threaded timing breakdown.
    pub stats: RunStats,
}

impl RunResult {
    /// One-line human summary to stderr. Deliberately separate from
    /// resumption guidance, which the CLI layer prints itself once it
    /// knows the seed and output path this library doesn't see.
    pub fn print_summary(&self) {
        let rate = if self.elapsed.as_secs_f64() > 0.0 {
            (self.written as f64) / self.elapsed.as_secs_f64()
        } else {
            0.0
        };
        if self.interrupted {
            eprintln!(
                "interrupted after {} {} ({}/s) in {:.2}s",
                format_bytes(self.written),
                self.action,
                format_bytes(rate as u64),
                self.elapsed.as_secs_f64()
            );
        } else {
            eprintln!(
                "{} {} ({}/s) in {:.2}s",
                self.action,
                format_bytes(self.written),
                format_bytes(rate as u64),
                self.elapsed.as_secs_f64()
            );
        }
        if let Some(err) = &self.error {
            eprintln!("{err}");
        }
    }

    /// `-vv`: per-worker timing breakdown, one line per worker plus the
    /// consumer. A no-op for the single-threaded path's stats, which get
    /// their own, simpler line.
    pub fn print_worker_stats(&self) {
        match &self.stats {
            RunStats::MultiThreaded { consumer, workers } => {
                eprintln!(
                    "consumer: {} blocks, {:?} waiting, {:?} writing",
                    consumer.blocks_consumed, consumer.wait_for_data_time, consumer.write_time
                );
                for w in workers {
                    eprintln!(
                        "worker {}: {} blocks, {:?} claiming, {:?} waiting, {:?} crypto ({} wait cycles)",
                        w.worker_id,
                        w.blocks_generated,
                        w.claim_time,
                        w.wait_for_space_time,
                        w.crypto_time,
                        w.wait_cycles
                    );
                }
            }
            RunStats::SingleThreaded(s) => {
                eprintln!(
                    "single-threaded: {} blocks, {:?} crypto, {:?} writing",
                    s.blocks_processed, s.crypto_time, s.write_time
                );
            }
        }
    }
}

/// Run the pipeline to completion (or until interrupted). Conceptually:
/// `IDLE -> RUNNING -> (DRAINING | ABORTING) -> (DONE | ABORTED)`.
///
/// Errors returned here are exactly the ones that preclude ever starting
/// a worker: bad output path (`IoOpen`). Everything that can happen
/// *after* workers start (write failure, interruption, a worker panic)
/// is folded into the returned [`RunResult`] instead of an `Err`, so the
/// caller always learns how many bytes made it to disk.
pub fn run(config: PipelineConfig) -> Result<RunResult> {
    let started = Instant::now();
    let action: &'static str = if config.dry { "generated" } else { "wrote" };

    let start_block = config.iseek / BLOCK_SIZE as u64;
    let start_offset = (config.iseek % BLOCK_SIZE as u64) as usize;

    let mut sink = output::open_output(
        config.output_path.as_deref(),
        config.oseek,
        config.total,
        config.dry,
    )?;

    let written = Arc::new(AtomicU64::new(0));
    let mut progress = if config.quiet {
        None
    } else {
        Some(ProgressDisplay::spawn(Arc::clone(&written), config.total))
    };

    let (run_written, mut interrupted, error, stats) = if config.workers == 0 {
        run_single_threaded(&config, start_block, start_offset, &mut sink, &written)
    } else {
        run_multi_threaded(&config, start_block, start_offset, &mut sink, &written)
    };

    if let Some(p) = progress.as_mut() {
        p.stop();
    }

    if error.is_some() {
        interrupted = true;
    }

    let elapsed = started.elapsed();
    info!(
        written = run_written,
        elapsed_ms = elapsed.as_millis() as u64,
        interrupted,
        "pipeline run finished"
    );

    Ok(RunResult {
        written: run_written,
        elapsed,
        interrupted,
        error,
        action,
        stats,
    })
}

fn run_single_threaded(
    config: &PipelineConfig,
    start_block: u64,
    start_offset: usize,
    sink: &mut OutputSink,
    written: &Arc<AtomicU64>,
) -> (u64, bool, Option<PipelineError>, RunStats) {
    let quit = Arc::new(AtomicBool::new(false));
    let mut watcher = InterruptWatcher::spawn({
        let quit = Arc::clone(&quit);
        move || quit.store(true, Ordering::SeqCst)
    });

    debug!("starting single-threaded fallback");
    let outcome = single::run_single_threaded(
        &config.key,
        config.cipher.as_ref(),
        start_block,
        start_offset,
        config.total,
        config.dry,
        sink,
        &quit,
        |w| written.store(w, Ordering::Relaxed),
    );

    watcher.stop();
    let interrupted = outcome.interrupted || watcher.was_interrupted();

    (
        outcome.written,
        interrupted,
        outcome.error,
        RunStats::SingleThreaded(outcome.stats),
    )
}

fn run_multi_threaded(
    config: &PipelineConfig,
    start_block: u64,
    start_offset: usize,
    sink: &mut OutputSink,
    written: &Arc<AtomicU64>,
) -> (u64, bool, Option<PipelineError>, RunStats) {
    let num_slots = config.workers + 2;
    let ring = Arc::new(RingBuffer::new(num_slots));
    let blkno = Arc::new(Mutex::new(start_block));
    let key = Arc::new(config.key.clone());

    let mut watcher = InterruptWatcher::spawn({
        let ring = Arc::clone(&ring);
        move || ring.shutdown()
    });

    debug!(workers = config.workers, num_slots, "starting worker pool");
    let handles = worker::spawn_workers(
        config.workers,
        Arc::clone(&ring),
        Arc::clone(&blkno),
        key,
        Arc::clone(&config.cipher),
    );

    let outcome = consumer::run_consumer(
        &ring,
        start_block,
        start_offset,
        config.total,
        config.dry,
        sink,
        |w| written.store(w, Ordering::Relaxed),
    );

    // Normal completion still needs to wake any worker parked on
    // `wait_for_space` for a slot the consumer will never free again.
    ring.shutdown();

    let mut worker_stats = Vec::with_capacity(handles.len());
    let mut panicked: Option<String> = None;
    for handle in handles {
        match handle.join() {
            Ok(stats) => worker_stats.push(stats),
            Err(payload) => {
                let message = panic_message(&payload);
                warn!(worker_error = %message, "worker thread panicked");
                panicked = Some(message);
            }
        }
    }
    worker_stats.sort_by_key(|s| s.worker_id);

    watcher.stop();

    let error = outcome.error.or_else(|| panicked.map(PipelineError::internal));
    let interrupted = outcome.interrupted || watcher.was_interrupted() || error.is_some();

    (
        outcome.written,
        interrupted,
        error,
        RunStats::MultiThreaded {
            consumer: outcome.stats,
            workers: worker_stats,
        },
    )
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::ChaCha20;

    fn config(workers: usize, total: Option<u64>) -> PipelineConfig {
        PipelineConfig {
            key: vec![0u8; 32],
            cipher: Arc::new(ChaCha20::new()),
            workers,
            total,
            iseek: 0,
            oseek: 0,
            output_path: None,
            dry: true,
            quiet: true,
        }
    }

    #[test]
    fn single_threaded_and_multi_threaded_agree_in_dry_mode() {
        // Dry mode can't compare bytes (nothing is captured), but both
        // paths should report the same total written.
        let single = run(config(0, Some(4 * BLOCK_SIZE as u64))).unwrap();
        let multi = run(config(3, Some(4 * BLOCK_SIZE as u64))).unwrap();
        assert_eq!(single.written, 4 * BLOCK_SIZE as u64);
        assert_eq!(multi.written, 4 * BLOCK_SIZE as u64);
        assert!(!single.interrupted);
        assert!(!multi.interrupted);
    }

    #[test]
    fn zero_total_writes_nothing() {
        let result = run(config(2, Some(0))).unwrap();
        assert_eq!(result.written, 0);
        assert!(!result.interrupted);
    }

    #[test]
    fn workers_much_greater_than_cpu_count_does_not_deadlock() {
        let result = run(config(64, Some(2 * BLOCK_SIZE as u64))).unwrap();
        assert_eq!(result.written, 2 * BLOCK_SIZE as u64);
    }
}
