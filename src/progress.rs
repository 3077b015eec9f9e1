//! The progress display: a second thread, entirely separate from the
//! pipeline, that periodically renders the shared
//! `written` counter. It owns no pipeline state beyond a cloned atomic
//! handle and a stop flag, and never touches the ring buffer, `quit`, or
//! any producer/consumer lock — so a slow terminal can never block
//! pipeline teardown.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::constants::PROGRESS_POLL_MS;
use crate::size::format_bytes;

/// A running progress display bound to a shared byte counter.
pub struct ProgressDisplay {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressDisplay {
    /// Spawn a progress thread rendering `written` (and, if `total` is
    /// known, a percentage) to stderr roughly ten times a second.
    pub fn spawn(written: Arc<AtomicU64>, total: Option<u64>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let started = Instant::now();

        let handle = std::thread::spawn(move || {
            let mut last_len = 0usize;
            while !stop_for_thread.load(Ordering::Relaxed) {
                render(&written, total, started, &mut last_len);
                std::thread::sleep(Duration::from_millis(PROGRESS_POLL_MS));
            }
            render(&written, total, started, &mut last_len);
            eprintln!();
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signal the progress thread to stop and join it. Joining is bounded
    /// in practice by the thread's own poll cadence — a small upper bound
    /// so terminal restoration stays prompt even under load.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressDisplay {
    fn drop(&mut self) {
        self.stop();
    }
}

fn render(written: &AtomicU64, total: Option<u64>, started: Instant, last_len: &mut usize) {
    let n = written.load(Ordering::Relaxed);
    let elapsed = started.elapsed().as_secs_f64().max(1e-6);
    let rate = (n as f64) / elapsed;

    let line = match total {
        Some(total) if total > 0 => {
            let pct = (n as f64 / total as f64 * 100.0).min(100.0);
            format!(
                "\r{} / {} ({pct:.1}%) — {}/s",
                format_bytes(n),
                format_bytes(total),
                format_bytes(rate as u64)
            )
        }
        _ => format!("\r{} — {}/s", format_bytes(n), format_bytes(rate as u64)),
    };

    // Pad over any leftover characters from a longer previous line.
    let pad = last_len.saturating_sub(line.len());
    eprint!("{line}{}", " ".repeat(pad));
    let _ = std::io::stderr().flush();
    *last_len = line.len();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_and_stop_does_not_hang() {
        let written = Arc::new(AtomicU64::new(0));
        let mut display = ProgressDisplay::spawn(Arc::clone(&written), Some(1024));
        written.store(512, Ordering::Relaxed);
        display.stop();
    }
}
