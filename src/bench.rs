//! Benchmark driver: an I/O-mode x thread-count matrix, reporting
//! median throughput over repeated short runs. Forbidden alongside
//! `--seed`/`--seek` at the CLI layer — the benchmark always uses a
//! fixed internal seed so results are comparable across invocations.

use std::sync::Arc;
use std::time::Duration;

use crate::cipher::{self, Cipher};
use crate::error::Result;
use crate::key;
use crate::pipeline::{self, PipelineConfig};
use crate::size::{format_bytes, sparse_range};

/// Where benchmark trials write their output. `Dry` skips writes
/// entirely (pure crypto + synchronization throughput); `Null` and
/// `File` both exercise the real write path, against `/dev/null` and a
/// real temporary file respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    Dry,
    Null,
    File,
}

impl IoMode {
    fn label(self) -> &'static str {
        match self {
            IoMode::Dry => "dry",
            IoMode::Null => "null",
            IoMode::File => "file",
        }
    }

    fn output_path(self, tmp_path: &str) -> Option<String> {
        match self {
            IoMode::Dry => None,
            IoMode::Null => Some("/dev/null".to_string()),
            IoMode::File => Some(tmp_path.to_string()),
        }
    }
}

/// One cell of the benchmark matrix: a mode/thread-count pair and its
/// measured median throughput.
#[derive(Debug, Clone)]
pub struct BenchResult {
    pub mode: IoMode,
    pub workers: usize,
    pub median_gbps: f64,
}

/// Benchmark matrix configuration.
pub struct BenchConfig {
    /// Cipher algorithm name, as accepted by `--alg`.
    pub alg: String,
    /// Bytes generated per trial.
    pub trial_bytes: u64,
    /// Trials per (mode, thread-count) cell; the reported figure is the
    /// median across these.
    pub repeats: usize,
    /// Thread counts to test, usually [`sparse_range`] over the local
    /// CPU count so the full matrix doesn't take forever.
    pub thread_counts: Vec<usize>,
    /// I/O modes to test.
    pub modes: Vec<IoMode>,
}

impl BenchConfig {
    /// A reasonable default matrix: dry/null/file modes, a sparse range
    /// of thread counts up to the local CPU count, 64 MiB per trial,
    /// three repeats per cell.
    pub fn default_matrix(alg: impl Into<String>) -> Self {
        let cpus = num_cpus::get();
        Self {
            alg: alg.into(),
            trial_bytes: 64 * 1024 * 1024,
            repeats: 3,
            thread_counts: sparse_range(cpus, 9),
            modes: vec![IoMode::Dry, IoMode::Null, IoMode::File],
        }
    }
}

/// Run the full benchmark matrix and return one [`BenchResult`] per
/// (mode, thread-count) cell, in the order tested.
pub fn run_benchmark(config: &BenchConfig) -> Result<Vec<BenchResult>> {
    let cipher: Arc<dyn Cipher> = Arc::from(cipher::lookup(&config.alg)?);
    let key = key::derive_key("randquik-benchmark-fixed-seed", cipher.key_bytes())?;

    let tmp_dir = tempfile::tempdir().map_err(|e| {
        crate::error::PipelineError::io_open("<benchmark tmpdir>", e)
    })?;
    let tmp_path = tmp_dir.path().join("randquik-bench.bin");
    let tmp_path_str = tmp_path.to_string_lossy().to_string();

    let mut results = Vec::with_capacity(config.modes.len() * config.thread_counts.len());

    for &mode in &config.modes {
        for &workers in &config.thread_counts {
            let mut samples = Vec::with_capacity(config.repeats);
            for _ in 0..config.repeats {
                let run_config = PipelineConfig {
                    key: key.clone(),
                    cipher: Arc::clone(&cipher),
                    workers,
                    total: Some(config.trial_bytes),
                    iseek: 0,
                    oseek: 0,
                    output_path: mode.output_path(&tmp_path_str),
                    dry: mode == IoMode::Dry,
                    quiet: true,
                };
                let result = pipeline::run(run_config)?;
                samples.push(throughput_gbps(result.written, result.elapsed));
            }
            let median = median(&mut samples);
            tracing::info!(
                mode = mode.label(),
                workers,
                gbps = median,
                "benchmark cell finished"
            );
            results.push(BenchResult {
                mode,
                workers,
                median_gbps: median,
            });
        }
    }

    Ok(results)
}

fn throughput_gbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(1e-9);
    (bytes as f64) / secs / 1_000_000_000.0
}

fn median(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
    samples[samples.len() / 2]
}

/// Render the matrix as a human-readable table for `--benchmark`'s
/// terminal output.
pub fn format_results(results: &[BenchResult]) -> String {
    let mut out = String::from("mode      workers  median throughput\n");
    for r in results {
        out.push_str(&format!(
            "{:<9} {:<8} {}/s\n",
            r.mode.label(),
            r.workers,
            format_bytes((r.median_gbps * 1_000_000_000.0) as u64)
        ));
    }
    out
}
