//! Error types for the RandQuik pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for RandQuik operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The five error kinds from the failure semantics design: bad arguments,
/// refusal to open the output, a failed write, user interruption, and an
/// internal (worker panic) condition.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Bad size string, bad seed, or conflicting flags — raised before any
    /// thread starts.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what was wrong with the argument.
        message: String,
    },

    /// The output path or stdout was refused (TTY binary refusal, open
    /// failure) — raised before workers start.
    #[error("cannot open output {path}: {source}")]
    IoOpen {
        /// The path (or `"stdout"`) that was refused.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A write to the output fd failed mid-run (e.g. `ENOSPC`). If the file
    /// was created by this run it has already been unlinked by the time
    /// this is returned.
    #[error("write to {path} failed: {source}")]
    IoWrite {
        /// The path that failed to accept further writes.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The user interrupted the run (Ctrl-C, broken pipe). Not a failure in
    /// the usual sense: the already-written prefix is intact.
    #[error("interrupted after {written} bytes")]
    Interrupted {
        /// Bytes successfully written before interruption.
        written: u64,
    },

    /// A worker thread panicked. Logged and treated as interrupted from
    /// the caller's perspective.
    #[error("worker failed: {message}")]
    Internal {
        /// Description of the internal failure.
        message: String,
    },
}

impl PipelineError {
    /// Build an `InvalidArgument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Build an `IoOpen` error for the given path (or `"stdout"`).
    pub fn io_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoOpen {
            path: path.into().display().to_string(),
            source,
        }
    }

    /// Build an `IoWrite` error for the given path.
    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoWrite {
            path: path.into().display().to_string(),
            source,
        }
    }

    /// Build an `Internal` error from a worker panic payload.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Exit code RandQuik should return to the shell for this error, per
    /// the documented exit-code contract: everything maps to 1.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether this error represents a graceful, resumable stop rather
    /// than a hard failure.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted { .. } | Self::Internal { .. })
    }
}
