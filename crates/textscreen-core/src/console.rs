#![forbid(unsafe_code)]

//! Console contract shared by every backend.
//!
//! A [`Console`] is the host terminal as TextScreen sees it: a size, a cursor,
//! an output byte stream, a raw/cooked input mode and a non-blocking input
//! [`ByteSource`]. The raw-terminal and native-console backends live in
//! `textscreen-tty`; [`MemoryConsole`] here records everything in memory and
//! backs the renderer and engine tests.

use std::collections::VecDeque;
use std::io;

/// Width used when the host cannot report its size.
pub const FALLBACK_WIDTH: u16 = 80;
/// Height used when the host cannot report its size.
pub const FALLBACK_HEIGHT: u16 = 25;

// ── Input ────────────────────────────────────────────────────────────────

/// Non-blocking byte input.
pub trait ByteSource {
    /// Next pending byte, or `None` if nothing is available right now.
    ///
    /// Must never block.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Discard everything currently pending.
    fn drain(&mut self) -> io::Result<()> {
        while self.read_byte()?.is_some() {}
        Ok(())
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).read_byte()
    }

    fn drain(&mut self) -> io::Result<()> {
        (**self).drain()
    }
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).read_byte()
    }

    fn drain(&mut self) -> io::Result<()> {
        (**self).drain()
    }
}

/// In-memory byte queue. Bytes pushed in one call become available together.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    pending: VecDeque<u8>,
}

impl ScriptedInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes behind whatever is already pending.
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes);
    }

    /// Number of bytes still pending.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl From<&[u8]> for ScriptedInput {
    fn from(bytes: &[u8]) -> Self {
        Self {
            pending: bytes.iter().copied().collect(),
        }
    }
}

impl ByteSource for ScriptedInput {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.pending.pop_front())
    }

    fn drain(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }
}

/// How a console encodes special keys on its input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEncoding {
    /// ESC-introduced ANSI sequences.
    EscapeSequences,
    /// 0xE0/0x00 prefix byte plus a scan code.
    ScanCodes,
}

// ── Size ─────────────────────────────────────────────────────────────────

/// Console size in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsoleSize {
    pub width: u16,
    pub height: u16,
    /// `true` when the host query failed and the 80x25 fallback was used.
    pub fallback: bool,
}

impl ConsoleSize {
    /// The size reported when the host query fails.
    pub const FALLBACK: Self = Self {
        width: FALLBACK_WIDTH,
        height: FALLBACK_HEIGHT,
        fallback: true,
    };

    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            fallback: false,
        }
    }

    /// A live size, or the fallback when either dimension is zero.
    #[must_use]
    pub const fn or_fallback(width: u16, height: u16) -> Self {
        if width == 0 || height == 0 {
            Self::FALLBACK
        } else {
            Self::new(width, height)
        }
    }

    /// Clamp a cursor position into `[0, width) x [0, height)`.
    #[must_use]
    pub fn clamp(self, x: i32, y: i32) -> (u16, u16) {
        let max_x = i32::from(self.width.max(1)) - 1;
        let max_y = i32::from(self.height.max(1)) - 1;
        // Both values fit in u16 after clamping.
        (x.clamp(0, max_x) as u16, y.clamp(0, max_y) as u16)
    }
}

// ── Console ──────────────────────────────────────────────────────────────

/// Restore routine the interrupt path can run without access to the console.
pub type EmergencyRestore = Box<dyn Fn() + Send + Sync>;

/// Host console capabilities.
pub trait Console: ByteSource {
    /// Current size; never fails, see [`ConsoleSize::fallback`].
    fn size(&self) -> ConsoleSize;

    /// Move the cursor, clamped to the live bounds.
    fn set_cursor_pos(&mut self, x: i32, y: i32) -> io::Result<()>;

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()>;

    /// Erase the screen and home the cursor.
    fn clear_screen(&mut self) -> io::Result<()>;

    /// Disable line buffering and echo. Entering again first restores the
    /// previously saved mode.
    fn enter_raw_mode(&mut self) -> io::Result<()>;

    /// Revert to the mode saved by [`Console::enter_raw_mode`]. A no-op when
    /// raw mode is not active.
    fn restore_mode(&mut self) -> io::Result<()>;

    fn is_raw(&self) -> bool;

    fn input_encoding(&self) -> InputEncoding;

    /// Whether Ctrl+C arrives as input byte 0x03 instead of a signal.
    fn interrupts_via_input(&self) -> bool {
        false
    }

    /// A closure that restores the host terminal from any thread.
    fn emergency_restore(&self) -> Option<EmergencyRestore> {
        None
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Bulk output of a frame, starting with the cursor at home.
    ///
    /// Must leave the screen exactly as `origin_row` CR LF pairs followed by
    /// each row and a CR LF would, including the scroll when the frame
    /// reaches the bottom row. The default writes exactly that.
    fn write_rows(&mut self, origin_row: u16, rows: &[&[u8]]) -> io::Result<()> {
        let mut frame = Vec::with_capacity(
            usize::from(origin_row) * 2 + rows.iter().map(|r| r.len() + 2).sum::<usize>(),
        );
        for _ in 0..origin_row {
            frame.extend_from_slice(b"\r\n");
        }
        for row in rows {
            frame.extend_from_slice(row);
            frame.extend_from_slice(b"\r\n");
        }
        self.write_bytes(&frame)
    }
}

// ── Memory console ───────────────────────────────────────────────────────

/// Console that records output in memory.
///
/// Every `write_bytes` call is kept as a separate chunk so tests can check
/// output granularity as well as content.
#[derive(Debug, Clone)]
pub struct MemoryConsole {
    size: ConsoleSize,
    encoding: InputEncoding,
    input: ScriptedInput,
    writes: Vec<Vec<u8>>,
    raw: bool,
    raw_entries: usize,
    cursor_visible: bool,
    flushes: usize,
}

impl MemoryConsole {
    #[must_use]
    pub fn new(size: ConsoleSize) -> Self {
        Self {
            size,
            encoding: InputEncoding::EscapeSequences,
            input: ScriptedInput::new(),
            writes: Vec::new(),
            raw: false,
            raw_entries: 0,
            cursor_visible: true,
            flushes: 0,
        }
    }

    /// Console whose size query fails.
    #[must_use]
    pub fn without_size() -> Self {
        Self::new(ConsoleSize::FALLBACK)
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: InputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Queue input bytes.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.push(bytes);
    }

    pub fn set_size(&mut self, size: ConsoleSize) {
        self.size = size;
    }

    /// Everything written so far, concatenated.
    #[must_use]
    pub fn output(&self) -> Vec<u8> {
        self.writes.concat()
    }

    /// Individual write chunks.
    #[must_use]
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    pub fn clear_output(&mut self) {
        self.writes.clear();
    }

    /// How many times raw mode was entered.
    #[must_use]
    pub fn raw_entries(&self) -> usize {
        self.raw_entries
    }

    #[must_use]
    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    #[must_use]
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl ByteSource for MemoryConsole {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.input.read_byte()
    }

    fn drain(&mut self) -> io::Result<()> {
        self.input.drain()
    }
}

impl Console for MemoryConsole {
    fn size(&self) -> ConsoleSize {
        self.size
    }

    fn set_cursor_pos(&mut self, x: i32, y: i32) -> io::Result<()> {
        let (x, y) = self.size.clamp(x, y);
        self.write_bytes(format!("\x1b[{};{}H", y + 1, x + 1).as_bytes())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.cursor_visible = visible;
        self.write_bytes(if visible { b"\x1b[?25h" } else { b"\x1b[?25l" })
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        self.write_bytes(b"\x1b[2J\x1b[H")
    }

    fn enter_raw_mode(&mut self) -> io::Result<()> {
        if self.raw {
            self.restore_mode()?;
        }
        self.raw = true;
        self.raw_entries += 1;
        Ok(())
    }

    fn restore_mode(&mut self) -> io::Result<()> {
        self.raw = false;
        Ok(())
    }

    fn is_raw(&self) -> bool {
        self.raw
    }

    fn input_encoding(&self) -> InputEncoding {
        self.encoding
    }

    fn interrupts_via_input(&self) -> bool {
        self.encoding == InputEncoding::ScanCodes
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        if !bytes.is_empty() {
            self.writes.push(bytes.to_vec());
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_input_is_fifo_and_drains() {
        let mut input = ScriptedInput::from(&b"ab"[..]);
        input.push(b"c");
        assert_eq!(input.read_byte().unwrap(), Some(b'a'));
        assert_eq!(input.pending(), 2);
        input.drain().unwrap();
        assert_eq!(input.read_byte().unwrap(), None);
    }

    #[test]
    fn default_drain_reads_until_empty() {
        struct Counting(u8);
        impl ByteSource for Counting {
            fn read_byte(&mut self) -> io::Result<Option<u8>> {
                if self.0 == 0 {
                    return Ok(None);
                }
                self.0 -= 1;
                Ok(Some(self.0))
            }
        }
        let mut src = Counting(5);
        src.drain().unwrap();
        assert_eq!(src.0, 0);
    }

    #[test]
    fn size_fallback_and_clamp() {
        assert_eq!(ConsoleSize::or_fallback(0, 40), ConsoleSize::FALLBACK);
        assert!(!ConsoleSize::or_fallback(100, 40).fallback);
        let size = ConsoleSize::new(80, 25);
        assert_eq!(size.clamp(-3, 7), (0, 7));
        assert_eq!(size.clamp(500, 500), (79, 24));
    }

    #[test]
    fn default_write_rows_uses_crlf() {
        let mut console = MemoryConsole::new(ConsoleSize::new(10, 5));
        console.write_rows(1, &[&b"ab"[..], &b"cd"[..]]).unwrap();
        assert_eq!(console.output(), b"\r\nab\r\ncd\r\n");
        assert_eq!(console.writes().len(), 1);
    }

    #[test]
    fn memory_console_reenters_raw_mode() {
        let mut console = MemoryConsole::new(ConsoleSize::new(10, 5));
        console.restore_mode().unwrap();
        assert!(!console.is_raw());
        console.enter_raw_mode().unwrap();
        console.enter_raw_mode().unwrap();
        assert!(console.is_raw());
        assert_eq!(console.raw_entries(), 2);
        console.restore_mode().unwrap();
        console.restore_mode().unwrap();
        assert!(!console.is_raw());
    }

    #[test]
    fn cursor_position_is_clamped() {
        let mut console = MemoryConsole::new(ConsoleSize::new(10, 5));
        console.set_cursor_pos(20, -1).unwrap();
        assert_eq!(console.output(), b"\x1b[1;10H");
    }
}
