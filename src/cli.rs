//! The CLI surface: a `clap`-derived `Args` struct implementing the
//! documented flag table, with validation errors surfaced as the
//! crate's own [`PipelineError::InvalidArgument`] rather than clap's
//! own panic-on-error path.

use clap::Parser;

use randquik::cipher;
use randquik::error::{PipelineError, Result};
use randquik::key;
use randquik::pipeline::PipelineConfig;
use randquik::size::parse_size;

/// High-throughput cryptographic random-byte generator.
#[derive(Parser, Debug)]
#[command(name = "randquik", version, about, long_about = None)]
pub struct Args {
    /// Printable seed; if omitted, 16 random alphanumerics are generated.
    #[arg(short, long)]
    pub seed: Option<String>,

    /// Total bytes to produce; omit for infinite.
    #[arg(short = 'l', long = "len")]
    pub len: Option<String>,

    /// Output path; `-` or omit means stdout.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Worker count. `0` selects the single-threaded path.
    #[arg(short, long, default_value_t = 1)]
    pub threads: usize,

    /// Cipher selection.
    #[arg(short, long, default_value = cipher::DEFAULT_ALG)]
    pub alg: String,

    /// Generate but skip writes (benchmark of crypto + synchronization
    /// only, not I/O).
    #[arg(long)]
    pub dry: bool,

    /// Shorthand for both `--iseek` and `--oseek`.
    #[arg(long)]
    pub seek: Option<String>,

    /// Start the keystream at this byte offset (affects the nonce).
    #[arg(long)]
    pub iseek: Option<String>,

    /// Start writing at this fd offset.
    #[arg(long)]
    pub oseek: Option<String>,

    /// Run the benchmark matrix. Forbids `--seed` and `--seek`.
    #[arg(long)]
    pub benchmark: bool,

    /// Suppress progress and the completion summary.
    #[arg(short, long)]
    pub quiet: bool,

    /// Stackable: `-v` shows the I/O mode summary, `-vv` per-worker
    /// stats.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Everything derived from the raw `Args` once parsed and validated:
/// the pipeline configuration plus the bits the CLI itself needs
/// (resumption command components) that don't belong in the library's
/// `RunResult`.
pub struct ResolvedRun {
    pub config: PipelineConfig,
    pub seed: String,
    pub total: Option<u64>,
    /// Whether `seed` was auto-generated rather than user-supplied — only
    /// then is a repeat command offered on normal completion.
    pub seed_was_generated: bool,
}

impl Args {
    /// Validate flag combinations and build a [`PipelineConfig`]. Never
    /// panics on bad input — every failure is a structured
    /// `InvalidArgument`, raised before any thread starts.
    pub fn resolve(&self) -> Result<ResolvedRun> {
        if self.benchmark && (self.seed.is_some() || self.seek.is_some()) {
            return Err(PipelineError::invalid_argument(
                "--benchmark cannot be combined with --seed or --seek",
            ));
        }

        let seed_was_generated = self.seed.is_none();
        let seed = match &self.seed {
            Some(s) => s.clone(),
            None => key::generate_random_seed(),
        };

        let cipher = cipher::lookup(&self.alg)?;
        let key_bytes = key::derive_key(&seed, cipher.key_bytes())?;

        let output_path = self.output.as_deref().map(std::path::Path::new);
        let total = parse_size(self.len.as_deref(), output_path)?;

        let seek = parse_size(self.seek.as_deref(), output_path)?;
        let iseek_only = parse_size(self.iseek.as_deref(), output_path)?;
        let oseek_only = parse_size(self.oseek.as_deref(), output_path)?;

        if seek.is_some() && (iseek_only.is_some() || oseek_only.is_some()) {
            return Err(PipelineError::invalid_argument(
                "--seek cannot be combined with --iseek or --oseek",
            ));
        }

        let iseek = seek.or(iseek_only).unwrap_or(0);
        let oseek = seek.or(oseek_only).unwrap_or(0);

        let config = PipelineConfig {
            key: key_bytes,
            cipher: std::sync::Arc::from(cipher),
            workers: self.threads,
            total,
            iseek,
            oseek,
            output_path: self.output.clone(),
            dry: self.dry,
            quiet: self.quiet,
        };

        Ok(ResolvedRun {
            config,
            seed,
            total,
            seed_was_generated,
        })
    }
}

/// Build the literal resumption command printed on interruption:
/// `randquik -s SEED --seek N -o PATH [-l LEN]`.
///
/// `base_iseek`/`base_oseek` are the offsets *this* run itself started
/// from (nonzero when resuming an already-resumed run); `written` is how
/// far this run got before stopping. The absolute resume point is the
/// base offset plus bytes written, not `written` alone — otherwise a
/// second interruption would rewind to the start of the first resume
/// instead of continuing from where it actually left off. When the two
/// offsets coincide (the common case), a single `--seek` is printed;
/// otherwise `--iseek`/`--oseek` are given separately.
pub fn continue_command(
    seed: &str,
    base_iseek: u64,
    base_oseek: u64,
    written: u64,
    output_path: Option<&str>,
    total: Option<u64>,
) -> String {
    let new_iseek = base_iseek + written;
    let new_oseek = base_oseek + written;

    let mut cmd = if new_iseek == new_oseek {
        format!("randquik -s {seed} --seek {new_iseek}")
    } else {
        format!("randquik -s {seed} --iseek {new_iseek} --oseek {new_oseek}")
    };
    if let Some(path) = output_path {
        cmd.push_str(&format!(" -o {path}"));
    }
    if let Some(total) = total {
        // `total` is this run's own target length, so the remainder is
        // relative to `written` alone, not the absolute offset.
        let remaining = total.saturating_sub(written);
        cmd.push_str(&format!(" -l {remaining}"));
    }
    cmd
}

/// Build a repeat command for a completed run: the same invocation, for
/// convenience when reproducing a result (`-vv` and `--benchmark`
/// sessions both benefit from an easy way to rerun exactly what just
/// ran).
pub fn repeat_command(seed: &str, output_path: Option<&str>, total: Option<u64>) -> String {
    let mut cmd = format!("randquik -s {seed}");
    if let Some(path) = output_path {
        cmd.push_str(&format!(" -o {path}"));
    }
    if let Some(total) = total {
        cmd.push_str(&format!(" -l {total}"));
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benchmark_forbids_seed() {
        let args = Args {
            seed: Some("x".into()),
            len: None,
            output: None,
            threads: 1,
            alg: cipher::DEFAULT_ALG.to_string(),
            dry: false,
            seek: None,
            iseek: None,
            oseek: None,
            benchmark: true,
            quiet: false,
            verbose: 0,
        };
        assert!(args.resolve().is_err());
    }

    #[test]
    fn seek_conflicts_with_iseek() {
        let args = Args {
            seed: None,
            len: None,
            output: None,
            threads: 1,
            alg: cipher::DEFAULT_ALG.to_string(),
            dry: false,
            seek: Some("1024".into()),
            iseek: Some("512".into()),
            oseek: None,
            benchmark: false,
            quiet: false,
            verbose: 0,
        };
        assert!(args.resolve().is_err());
    }

    #[test]
    fn seek_sets_both_iseek_and_oseek() {
        let args = Args {
            seed: Some("K".into()),
            len: None,
            output: None,
            threads: 1,
            alg: cipher::DEFAULT_ALG.to_string(),
            dry: true,
            seek: Some("2048".into()),
            iseek: None,
            oseek: None,
            benchmark: false,
            quiet: true,
            verbose: 0,
        };
        let resolved = args.resolve().unwrap();
        assert_eq!(resolved.config.iseek, 2048);
        assert_eq!(resolved.config.oseek, 2048);
    }

    #[test]
    fn continue_command_reflects_remaining_bytes() {
        let cmd = continue_command("Hello", 0, 0, 100, Some("/tmp/a"), Some(300));
        assert!(cmd.contains("--seek 100"));
        assert!(cmd.contains("-l 200"));
        assert!(cmd.contains("-o /tmp/a"));
    }

    #[test]
    fn continue_command_accounts_for_the_run_s_own_starting_offset() {
        // A run that itself started at iseek=oseek=500 and got interrupted
        // after 100 more bytes must resume at 600, not 100.
        let cmd = continue_command("Hello", 500, 500, 100, Some("/tmp/a"), None);
        assert!(cmd.contains("--seek 600"));
    }

    #[test]
    fn continue_command_splits_iseek_and_oseek_when_they_diverge() {
        let cmd = continue_command("Hello", 10, 20, 5, None, None);
        assert!(cmd.contains("--iseek 15"));
        assert!(cmd.contains("--oseek 25"));
        assert!(!cmd.contains("--seek "));
    }
}
