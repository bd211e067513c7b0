#![forbid(unsafe_code)]

//! Termios raw mode.
//!
//! TextScreen's raw mode is narrower than `cfmakeraw`: only echo and line
//! buffering are turned off, reads return after one byte, and `ISIG` stays on
//! so Ctrl+C still raises SIGINT.

use std::fs::File;
use std::io;
use std::sync::Mutex;

use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use textscreen_core::console::EmergencyRestore;

/// RAII guard that saves the original termios and restores it on drop.
///
/// The guard owns a handle to the terminal so the restore never depends on
/// stdin still being a tty.
pub struct RawModeGuard {
    original: Termios,
    tty: File,
    restored: bool,
}

impl RawModeGuard {
    /// Enter raw mode on the controlling terminal.
    pub fn enter() -> io::Result<Self> {
        Self::enter_on(File::open("/dev/tty")?)
    }

    /// Enter raw mode on an already open terminal.
    pub fn enter_on(tty: File) -> io::Result<Self> {
        let original = termios::tcgetattr(&tty).map_err(io::Error::other)?;
        termios::tcsetattr(&tty, SetArg::TCSANOW, &raw_attributes(&original))
            .map_err(io::Error::other)?;
        textscreen_core::info!("raw mode entered");
        Ok(Self {
            original,
            tty,
            restored: false,
        })
    }

    /// The attributes that will be restored.
    #[must_use]
    pub fn original(&self) -> &Termios {
        &self.original
    }

    /// Restore now, reporting failure.
    pub fn restore(mut self) -> io::Result<()> {
        self.restore_inner()
    }

    /// Closure that restores the saved attributes from any thread.
    pub fn emergency_restore(&self) -> io::Result<EmergencyRestore> {
        let tty = self.tty.try_clone()?;
        let saved = Mutex::new(self.original.clone());
        Ok(Box::new(move || {
            if let Ok(saved) = saved.lock() {
                let _ = termios::tcsetattr(&tty, SetArg::TCSANOW, &saved);
            }
        }))
    }

    fn restore_inner(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        termios::tcsetattr(&self.tty, SetArg::TCSANOW, &self.original).map_err(io::Error::other)?;
        textscreen_core::info!("raw mode restored");
        Ok(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best-effort restore.
        let _ = self.restore_inner();
    }
}

impl std::fmt::Debug for RawModeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawModeGuard")
            .field("restored", &self.restored)
            .finish_non_exhaustive()
    }
}

/// `original` with echo and canonical input off, one-byte reads, no timeout.
#[must_use]
pub fn raw_attributes(original: &Termios) -> Termios {
    let mut raw = original.clone();
    raw.local_flags.remove(LocalFlags::ECHO | LocalFlags::ICANON);
    raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
    raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
    raw
}
