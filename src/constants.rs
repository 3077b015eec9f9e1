//! Fixed sizing constants for the keystream pipeline.

/// Fixed block size: 1 MiB. Amortizes per-call crypto overhead while
/// fitting comfortably in L2 cache.
pub const BLOCK_SIZE: usize = 1024 * 1024;

/// Number of random alphanumeric characters in an auto-generated seed.
pub const AUTO_SEED_LEN: usize = 16;

/// Upper bound the progress display polls the stop flag at, in
/// milliseconds, so a slow terminal never blocks pipeline teardown.
pub const PROGRESS_POLL_MS: u64 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_size_is_one_mebibyte() {
        assert_eq!(BLOCK_SIZE, 1 << 20);
    }
}
