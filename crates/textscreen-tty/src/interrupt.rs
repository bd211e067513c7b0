#![forbid(unsafe_code)]

//! Interrupt bridge.
//!
//! SIGINT and SIGTERM are caught on a dedicated signal-hook thread. The thread
//! never calls back into the application: when a handler is registered it
//! only raises a flag that the main loop drains, otherwise it restores the
//! terminal and exits with `128 + signal`.
//!
//! Consoles that deliver Ctrl+C as input go through [`InterruptState::raise`]
//! (or [`terminate`]) from the main thread instead.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use textscreen_core::console::EmergencyRestore;

/// Signal id passed to interrupt handlers, whatever the host reported.
pub const INTERRUPT_SIGNAL: i32 = 2;

/// Flags shared between the signal thread and the main loop.
#[derive(Debug, Default)]
pub struct InterruptState {
    pending: AtomicBool,
    handled: AtomicBool,
}

impl InterruptState {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record an interrupt for the main loop.
    pub fn raise(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    /// Consume a pending interrupt.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Whether the application registered a handler. Without one, signals
    /// terminate the process.
    pub fn set_handled(&self, handled: bool) {
        self.handled.store(handled, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_handled(&self) -> bool {
        self.handled.load(Ordering::SeqCst)
    }
}

/// What the signal thread does with one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Flag raised for the main loop.
    Deferred,
    /// Restore and exit with this status.
    Exit(i32),
}

/// Decide how to react to `signal`, raising the flag when deferring.
pub fn on_signal(state: &InterruptState, signal: i32) -> SignalAction {
    if state.is_handled() {
        state.raise();
        SignalAction::Deferred
    } else {
        SignalAction::Exit(128 + signal)
    }
}

/// Run `restore` (if any) and exit with `128 + signal`.
pub fn terminate(restore: Option<&EmergencyRestore>, signal: i32) -> ! {
    textscreen_core::warn!(signal, "termination signal received, cleaning up");
    if let Some(restore) = restore {
        restore();
    }
    std::process::exit(128 + signal)
}

/// Owns the signal thread; dropping it unregisters the handlers.
#[derive(Debug)]
pub struct InterruptGuard {
    #[cfg(unix)]
    handle: signal_hook::iterator::Handle,
    #[cfg(unix)]
    thread: Option<std::thread::JoinHandle<()>>,
}

impl InterruptGuard {
    /// Start listening for SIGINT/SIGTERM.
    ///
    /// `restore` is what the exit path runs when no handler is registered.
    #[cfg(unix)]
    pub fn install(
        state: Arc<InterruptState>,
        restore: Option<EmergencyRestore>,
    ) -> io::Result<Self> {
        use signal_hook::consts::signal::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(io::Error::other)?;
        let handle = signals.handle();
        let thread = std::thread::spawn(move || {
            for signal in signals.forever() {
                textscreen_core::debug!(signal, "interrupt received");
                let signal = if signal == SIGINT { INTERRUPT_SIGNAL } else { signal };
                if let SignalAction::Exit(_) = on_signal(&state, signal) {
                    terminate(restore.as_ref(), signal);
                }
            }
        });
        textscreen_core::debug!("interrupt handler installed");
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    /// Consoles without signals report Ctrl+C as input; nothing to install.
    #[cfg(not(unix))]
    pub fn install(
        _state: Arc<InterruptState>,
        _restore: Option<EmergencyRestore>,
    ) -> io::Result<Self> {
        Ok(Self {})
    }
}

#[cfg(unix)]
impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
