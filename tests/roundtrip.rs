//! Filesystem-backed invariant and round-trip-law tests, covering the
//! properties that only make sense once bytes actually land on disk:
//! cross-thread-count determinism, the concatenation law, and the
//! resumption law.

use std::io::Read;
use std::sync::Arc;

use proptest::prelude::*;
use tempfile::tempdir;

use randquik::cipher::{self, Cipher};
use randquik::key;
use randquik::pipeline::{self, PipelineConfig};

const BLOCK_SIZE: u64 = 1024 * 1024;

fn config_for(
    seed: &str,
    workers: usize,
    total: Option<u64>,
    iseek: u64,
    oseek: u64,
    output_path: Option<String>,
) -> PipelineConfig {
    let cipher: Arc<dyn Cipher> = Arc::new(cipher::ChaCha20::new());
    let key_bytes = key::derive_key(seed, cipher.key_bytes()).unwrap();
    PipelineConfig {
        key: key_bytes,
        cipher,
        workers,
        total,
        iseek,
        oseek,
        output_path,
        dry: false,
        quiet: true,
    }
}

fn run_to_file(seed: &str, workers: usize, total: u64, iseek: u64, oseek: u64) -> Vec<u8> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.bin");
    let config = config_for(
        seed,
        workers,
        Some(total),
        iseek,
        oseek,
        Some(path.to_str().unwrap().to_string()),
    );
    let result = pipeline::run(config).unwrap();
    assert_eq!(result.written, total);
    assert!(!result.interrupted);

    let mut buf = Vec::new();
    std::fs::File::open(&path)
        .unwrap()
        .read_to_end(&mut buf)
        .unwrap();
    buf
}

#[test]
fn workers_zero_matches_multi_threaded_output() {
    let seed = "determinism-seed";
    let total = 3 * BLOCK_SIZE + 12_345;

    let single = run_to_file(seed, 0, total, 0, 0);
    let multi_1 = run_to_file(seed, 1, total, 0, 0);
    let multi_4 = run_to_file(seed, 4, total, 0, 0);

    assert_eq!(single, multi_1);
    assert_eq!(single, multi_4);
}

#[test]
fn concatenation_law_holds_across_an_iseek_boundary() {
    let seed = "concat-seed";
    let x = BLOCK_SIZE + 777;
    let y = 2 * BLOCK_SIZE + 42;

    let whole = run_to_file(seed, 4, x + y, 0, 0);

    let dir = tempdir().unwrap();
    let path = dir.path().join("parts.bin");
    let path_str = path.to_str().unwrap().to_string();

    let first = pipeline::run(config_for(seed, 4, Some(x), 0, 0, Some(path_str.clone()))).unwrap();
    assert_eq!(first.written, x);

    let second =
        pipeline::run(config_for(seed, 4, Some(y), x, x, Some(path_str.clone()))).unwrap();
    assert_eq!(second.written, y);

    let mut parts = Vec::new();
    std::fs::File::open(&path)
        .unwrap()
        .read_to_end(&mut parts)
        .unwrap();

    assert_eq!(whole, parts);
}

#[test]
fn resumption_law_reproduces_the_uninterrupted_run() {
    let seed = "resume-seed";
    let total = 3 * BLOCK_SIZE;
    let k = BLOCK_SIZE + 1024;

    let whole = run_to_file(seed, 4, total, 0, 0);

    let dir = tempdir().unwrap();
    let path = dir.path().join("resumed.bin");
    let path_str = path.to_str().unwrap().to_string();

    // Simulate an interruption after `k` bytes: run only the first `k`
    // bytes, then resume with --iseek k --oseek k.
    let first = pipeline::run(config_for(seed, 4, Some(k), 0, 0, Some(path_str.clone()))).unwrap();
    assert_eq!(first.written, k);

    let rest = total - k;
    let second =
        pipeline::run(config_for(seed, 4, Some(rest), k, k, Some(path_str.clone()))).unwrap();
    assert_eq!(second.written, rest);

    let mut resumed = Vec::new();
    std::fs::File::open(&path)
        .unwrap()
        .read_to_end(&mut resumed)
        .unwrap();

    assert_eq!(whole, resumed);
}

#[test]
fn zero_total_produces_an_empty_file() {
    let bytes = run_to_file("zero-seed", 2, 0, 0, 0);
    assert!(bytes.is_empty());
}

#[test]
fn sub_block_total_produces_a_single_partial_block() {
    let bytes = run_to_file("small-seed", 2, 513, 0, 0);
    assert_eq!(bytes.len(), 513);
}

#[test]
fn unaligned_iseek_produces_a_partial_head() {
    let seed = "head-seed";
    let iseek = BLOCK_SIZE / 2 + 37;
    let total = BLOCK_SIZE;

    let a = run_to_file(seed, 3, total, iseek, 0);
    let b = run_to_file(seed, 0, total, iseek, 0);
    assert_eq!(a, b);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn determinism_holds_for_arbitrary_small_totals_and_thread_counts(
        total in 0u64..(2 * BLOCK_SIZE),
        workers_a in 0usize..5,
        workers_b in 0usize..5,
    ) {
        let seed = "proptest-seed";
        let a = run_to_file(seed, workers_a, total, 0, 0);
        let b = run_to_file(seed, workers_b, total, 0, 0);
        prop_assert_eq!(a, b);
    }
}
