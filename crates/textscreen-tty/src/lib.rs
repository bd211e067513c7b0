#![forbid(unsafe_code)]
//! Console backends for TextScreen.
//!
//! Two implementations of [`textscreen_core::console::Console`]:
//!
//! | Backend | Output | Input | Raw mode | Ctrl+C |
//! |---------|--------|-------|----------|--------|
//! | [`TtyConsole`] | ANSI escape sequences | `/dev/tty`, ESC sequences | termios | signal |
//! | [`NativeConsole`] | crossterm commands | crossterm events as scan codes | crossterm | input byte |
//!
//! Both have headless constructors that take an in-memory writer and scripted
//! input, so the same contract tests run against either one.
//!
//! ## Escape Sequence Reference
//!
//! | Feature          | Sequence          |
//! |------------------|-------------------|
//! | Cursor position  | `CSI row ; col H` |
//! | Cursor show/hide | `CSI ? 25 h/l`    |
//! | Clear screen     | `CSI 2 J`         |
//! | Cursor home      | `CSI H`           |

pub mod interrupt;
pub mod native;
#[cfg(unix)]
pub mod raw_mode;
pub mod tty;

pub use interrupt::{INTERRUPT_SIGNAL, InterruptGuard, InterruptState};
pub use native::{CrosstermEvents, EventSource, NativeConsole, ScriptedEvents};
#[cfg(unix)]
pub use raw_mode::RawModeGuard;
#[cfg(unix)]
pub use tty::TtyInput;
pub use tty::{SizeSource, TtyConsole};

// ── Escape Sequences ─────────────────────────────────────────────────────

pub(crate) const CURSOR_SHOW: &[u8] = b"\x1b[?25h";
pub(crate) const CURSOR_HIDE: &[u8] = b"\x1b[?25l";
pub(crate) const CLEAR_SCREEN: &[u8] = b"\x1b[2J";
pub(crate) const CURSOR_HOME: &[u8] = b"\x1b[H";

/// `CSI row ; col H` for a zero-based position.
pub(crate) fn cursor_position(x: u16, y: u16) -> Vec<u8> {
    format!("\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_position_is_one_based() {
        assert_eq!(cursor_position(0, 0), b"\x1b[1;1H");
        assert_eq!(cursor_position(79, 24), b"\x1b[25;80H");
        assert_eq!(cursor_position(u16::MAX, 0), b"\x1b[1;65536H");
    }
}
