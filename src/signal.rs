//! Signal handling: a process-wide `ctrlc` handler that flips one
//! shared flag exactly once, and a small watcher thread
//! per run that translates that flag into this run's own cancellation
//! (ring shutdown or the single-threaded quit flag). No unwinding crosses
//! the signal boundary — the OS signal handler only ever stores a bool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::thread::JoinHandle;
use std::time::Duration;

use once_cell::sync::Lazy;

/// Process-wide "Ctrl-C was pressed" flag. `ctrlc::set_handler` can only
/// be installed once per process, so this is shared across every
/// pipeline run in the process (the benchmark driver runs the pipeline
/// many times); each run resets it before starting and watches it via
/// [`InterruptWatcher`].
static SIGNALED: Lazy<Arc<AtomicBool>> = Lazy::new(|| Arc::new(AtomicBool::new(false)));
static HANDLER_INSTALLED: Once = Once::new();

/// Install the process-wide Ctrl-C handler, if not already installed.
/// Safe to call from every run — idempotent.
pub fn install_handler() {
    HANDLER_INSTALLED.call_once(|| {
        let flag = Arc::clone(&SIGNALED);
        // ctrlc's own default behavior already handles SIGPIPE-adjacent
        // concerns on unix via its "termination" feature; we only need
        // the bool flip here.
        let _ = ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        });
    });
}

/// A watcher thread for one pipeline run: polls the process-wide signal
/// flag and invokes `cancel` the first time it sees it set, then exits.
/// Also stops (without calling `cancel`) once the run itself reports it
/// is done via [`InterruptWatcher::stop`].
pub struct InterruptWatcher {
    done: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InterruptWatcher {
    /// Reset the shared signal flag for a fresh run and spawn the
    /// watcher. `cancel` must be cheap and idempotent — it may run
    /// concurrently with the run's own teardown.
    pub fn spawn(cancel: impl Fn() + Send + 'static) -> Self {
        install_handler();
        SIGNALED.store(false, Ordering::SeqCst);

        let done = Arc::new(AtomicBool::new(false));
        let done_for_thread = Arc::clone(&done);

        let handle = std::thread::spawn(move || {
            while !done_for_thread.load(Ordering::Relaxed) {
                if SIGNALED.load(Ordering::SeqCst) {
                    cancel();
                    return;
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        });

        Self {
            done,
            handle: Some(handle),
        }
    }

    /// Tell the watcher the run is over and join it.
    pub fn stop(&mut self) {
        self.done.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Whether an interrupt was observed during this run.
    pub fn was_interrupted(&self) -> bool {
        SIGNALED.load(Ordering::SeqCst)
    }
}

impl Drop for InterruptWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
