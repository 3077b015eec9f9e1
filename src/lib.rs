//! RandQuik — a high-throughput cryptographic random-byte generator.
//!
//! The library is the parallel keystream pipeline: a ring-buffer
//! producer/consumer engine that fans worker threads over a stream
//! cipher and funnels their output into a single ordered byte stream.
//! The binary (`src/main.rs`) is a thin CLI composition of this library
//! plus argument parsing and a progress display.

pub mod bench;
pub mod cipher;
pub mod constants;
pub mod error;
pub mod key;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod ring;
pub mod signal;
pub mod size;
pub mod stats;

pub use error::{PipelineError, Result};
pub use pipeline::{run, PipelineConfig, RunResult};

/// Crate version, surfaced for `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
