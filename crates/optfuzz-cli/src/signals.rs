//! Interrupt handling for fuzz campaigns.
//!
//! SIGINT and SIGTERM request a stop: the campaign finishes or abandons
//! the current iteration, removes its artifacts, and exits normally. A
//! second signal terminates the process immediately.
//!
//! The handler sets the campaign's stop flag itself. An interrupt also
//! reaches the running tool, and the driver must already see the stop
//! when that tool's failure comes back.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Stop flag shared with the driver, installed before any handler.
static STOP_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Signals received since the handlers were installed.
static SIGNALS_RECEIVED: AtomicU32 = AtomicU32::new(0);

/// Exit status used when a second signal forces termination.
const FORCED_EXIT_CODE: i32 = 130;

/// Shares a stop request between the signal handler and the campaign.
#[derive(Debug, Clone)]
pub struct SignalHandler {
    stop: Arc<AtomicBool>,
    installed: bool,
}

impl SignalHandler {
    /// Register SIGINT and SIGTERM handlers.
    ///
    /// Every installed handler shares one process-wide stop flag. On
    /// non-Unix platforms no handler is installed.
    pub fn new() -> Self {
        let handler = Self {
            stop: Arc::clone(STOP_FLAG.get_or_init(|| Arc::new(AtomicBool::new(false)))),
            installed: cfg!(unix),
        };

        #[cfg(unix)]
        register_unix_handlers();

        handler
    }

    /// A handler that is not wired to any OS signal.
    pub fn detached() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            installed: false,
        }
    }

    /// Flag to hand to the campaign driver.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Check if a stop has been requested.
    #[inline]
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Number of SIGINT/SIGTERM deliveries, including repeats.
    pub fn signals_received(&self) -> u32 {
        if self.installed {
            SIGNALS_RECEIVED.load(Ordering::SeqCst)
        } else {
            0
        }
    }
}

#[cfg(unix)]
fn register_unix_handlers() {
    use std::os::raw::c_int;

    extern "C" fn on_stop_signal(_: c_int) {
        let previous = SIGNALS_RECEIVED.fetch_add(1, Ordering::SeqCst);
        // OnceLock::get is a plain atomic load; the flag exists before registration
        if let Some(stop) = STOP_FLAG.get() {
            stop.store(true, Ordering::SeqCst);
        }
        if previous > 0 {
            // SAFETY: _exit is async-signal-safe.
            unsafe { libc::_exit(FORCED_EXIT_CODE) };
        }
    }

    // SAFETY: the handler only touches atomics and calls _exit.
    unsafe {
        libc::signal(libc::SIGINT, on_stop_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_stop_signal as libc::sighandler_t);
    }

    debug!("Unix signal handlers registered");
}
