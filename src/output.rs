//! Opening and sizing the output fd.
//!
//! Three shapes: a named file (opened read-write, created if needed,
//! truncated/seeked as the run demands), stdout, or a dry-run sentinel
//! that accepts writes into the void. Accessed only by the consumer —
//! single writer, no locking.

use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal, Stdout, Write};
#[cfg(target_os = "macos")]
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// The opened output destination.
pub enum OutputSink {
    /// A real, seekable file or block device.
    File {
        file: File,
        path: PathBuf,
        /// Whether this run created the file (vs. it already existing) —
        /// determines whether a write failure unlinks it.
        created: bool,
    },
    /// Standard output, already verified not to be a terminal.
    Stdout(Stdout),
    /// `--dry`: accept and discard everything.
    Null,
}

impl OutputSink {
    /// Write `buf` in full. For `Null`, a no-op that always succeeds.
    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            OutputSink::File { file, .. } => file.write_all(buf),
            OutputSink::Stdout(stdout) => stdout.write_all(buf),
            OutputSink::Null => Ok(()),
        }
    }

    /// Display path for error messages and resumption commands.
    pub fn display_path(&self) -> String {
        match self {
            OutputSink::File { path, .. } => path.display().to_string(),
            OutputSink::Stdout(_) => "stdout".to_string(),
            OutputSink::Null => "<dry-run>".to_string(),
        }
    }

    /// If this sink created its backing file this run, remove it. Called
    /// on a fatal write error, so a failed run doesn't leave behind a
    /// half-written file masquerading as a complete one.
    pub fn unlink_if_created(&self) {
        if let OutputSink::File {
            path,
            created: true,
            ..
        } = self
        {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Open the output destination.
///
/// `path = None` or `Some("-")` means stdout; a stdout attached to a
/// terminal is refused outright. In dry mode, no fd is touched at all —
/// the sentinel `Null` sink is returned unconditionally, path validation
/// included, since dry mode's whole point is to skip all writes.
pub fn open_output(
    path: Option<&str>,
    oseek: u64,
    total: Option<u64>,
    dry: bool,
) -> Result<OutputSink> {
    if dry {
        return Ok(OutputSink::Null);
    }

    let is_stdout = matches!(path, None | Some("-"));
    if is_stdout {
        if io::stdout().is_terminal() {
            return Err(PipelineError::io_open(
                "stdout",
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "refusing to write binary keystream to a terminal",
                ),
            ));
        }
        return Ok(OutputSink::Stdout(io::stdout()));
    }

    let path = Path::new(path.unwrap());
    let created = !path.exists();

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .map_err(|e| PipelineError::io_open(path, e))?;

    if let Some(total) = total {
        let required = oseek + total;
        let current = file.metadata().map(|m| m.len()).unwrap_or(0);
        if required > current {
            // Best-effort preallocation, matching the original: a block
            // device target returns EINVAL from ftruncate (it isn't a
            // regular file), and that must not block opening a disk-wipe
            // output, so the error is ignored rather than propagated.
            let _ = file.set_len(required);
        }
    }

    {
        use std::io::Seek;
        let mut f = &file;
        f.seek(io::SeekFrom::Start(oseek))
            .map_err(|e| PipelineError::io_open(path, e))?;
    }

    request_no_cache(&file);

    Ok(OutputSink::File {
        file,
        path: path.to_path_buf(),
        created,
    })
}

/// Request that macOS bypass the page cache for this fd (`F_NOCACHE`),
/// matching the original's behavior for large sequential writes. A
/// best-effort hint; failure is ignored.
#[cfg(target_os = "macos")]
fn request_no_cache(file: &File) {
    // SAFETY: `file`'s fd is valid for the duration of this call; F_NOCACHE
    // takes an int argument and has no failure mode that corrupts state.
    unsafe {
        libc::fcntl(file.as_raw_fd(), libc::F_NOCACHE, 1);
    }
}

#[cfg(not(target_os = "macos"))]
fn request_no_cache(_file: &File) {}
