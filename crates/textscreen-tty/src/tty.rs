#![forbid(unsafe_code)]

//! Raw-terminal backend (ANSI escape sequences over stdout, termios).

use std::io::{self, Write};

use textscreen_core::console::{
    ByteSource, Console, ConsoleSize, EmergencyRestore, InputEncoding,
};

use crate::{CLEAR_SCREEN, CURSOR_HIDE, CURSOR_HOME, CURSOR_SHOW, cursor_position};

#[cfg(unix)]
use crate::raw_mode::RawModeGuard;

// ── Size ─────────────────────────────────────────────────────────────────

/// Where a [`TtyConsole`] learns its size.
#[derive(Debug)]
pub enum SizeSource {
    /// Ask the terminal on every query.
    #[cfg(unix)]
    Tty(std::fs::File),
    /// A fixed size.
    Fixed(ConsoleSize),
    /// Every query fails.
    Unavailable,
}

impl SizeSource {
    fn query(&self) -> ConsoleSize {
        match self {
            #[cfg(unix)]
            Self::Tty(tty) => match rustix::termios::tcgetwinsize(tty) {
                Ok(ws) => ConsoleSize::or_fallback(ws.ws_col, ws.ws_row),
                Err(_) => ConsoleSize::FALLBACK,
            },
            Self::Fixed(size) => *size,
            Self::Unavailable => ConsoleSize::FALLBACK,
        }
    }
}

// ── Input ────────────────────────────────────────────────────────────────

/// Non-blocking reader over a terminal file descriptor.
///
/// Each empty poll asks `poll(2)` with a zero timeout; whatever is readable
/// at that moment is buffered and handed out one byte at a time.
#[cfg(unix)]
#[derive(Debug)]
pub struct TtyInput {
    reader: std::fs::File,
    pending: std::collections::VecDeque<u8>,
}

#[cfg(unix)]
impl TtyInput {
    /// Read from the controlling terminal.
    pub fn open() -> io::Result<Self> {
        Ok(Self::from_file(std::fs::File::open("/dev/tty")?))
    }

    /// Read from an arbitrary descriptor (a pipe or socket in tests).
    #[must_use]
    pub fn from_file(reader: std::fs::File) -> Self {
        Self {
            reader,
            pending: std::collections::VecDeque::new(),
        }
    }

    fn ready(&self) -> io::Result<bool> {
        use std::os::fd::AsFd;
        let mut fds = [nix::poll::PollFd::new(
            self.reader.as_fd(),
            nix::poll::PollFlags::POLLIN,
        )];
        match nix::poll::poll(&mut fds, nix::poll::PollTimeout::ZERO) {
            Ok(n) => Ok(n > 0),
            Err(nix::errno::Errno::EINTR) => Ok(false),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        use std::io::Read;
        if !self.ready()? {
            return Ok(());
        }
        let mut buf = [0u8; 256];
        match self.reader.read(&mut buf) {
            Ok(n) => {
                self.pending.extend(&buf[..n]);
                Ok(())
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(unix)]
impl ByteSource for TtyInput {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.pending.is_empty() {
            self.fill()?;
        }
        Ok(self.pending.pop_front())
    }
}

// ── Console ──────────────────────────────────────────────────────────────

enum ModeControl {
    #[cfg(unix)]
    Termios(Option<RawModeGuard>),
    Headless { raw: bool },
}

/// Raw-terminal console.
///
/// Output is plain ANSI on `W`; keys arrive as ESC sequences from `I`.
pub struct TtyConsole<W: Write, I: ByteSource> {
    out: W,
    input: I,
    size: SizeSource,
    mode: ModeControl,
}

#[cfg(unix)]
impl TtyConsole<io::Stdout, TtyInput> {
    /// Open the controlling terminal. Raw mode is entered separately.
    pub fn open() -> io::Result<Self> {
        let input = TtyInput::open()?;
        let size = SizeSource::Tty(std::fs::File::open("/dev/tty")?);
        Ok(Self {
            out: io::stdout(),
            input,
            size,
            mode: ModeControl::Termios(None),
        })
    }
}

impl<W: Write, I: ByteSource> TtyConsole<W, I> {
    /// A console that never touches the terminal. Raw mode is only tracked.
    #[must_use]
    pub fn headless(out: W, input: I, size: SizeSource) -> Self {
        Self {
            out,
            input,
            size,
            mode: ModeControl::Headless { raw: false },
        }
    }

    /// The output sink.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// The input source.
    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Whether this console controls a real terminal.
    #[must_use]
    pub fn is_live(&self) -> bool {
        match self.mode {
            #[cfg(unix)]
            ModeControl::Termios(_) => true,
            ModeControl::Headless { .. } => false,
        }
    }
}

impl<W: Write, I: ByteSource> ByteSource for TtyConsole<W, I> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.input.read_byte()
    }

    fn drain(&mut self) -> io::Result<()> {
        self.input.drain()
    }
}

impl<W: Write, I: ByteSource> Console for TtyConsole<W, I> {
    fn size(&self) -> ConsoleSize {
        let size = self.size.query();
        if size.fallback {
            textscreen_core::debug!("terminal size unavailable, using fallback");
        }
        size
    }

    fn set_cursor_pos(&mut self, x: i32, y: i32) -> io::Result<()> {
        let (x, y) = self.size().clamp(x, y);
        self.out.write_all(&cursor_position(x, y))
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.out
            .write_all(if visible { CURSOR_SHOW } else { CURSOR_HIDE })
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        self.out.write_all(CLEAR_SCREEN)?;
        self.out.write_all(CURSOR_HOME)
    }

    fn enter_raw_mode(&mut self) -> io::Result<()> {
        if self.is_raw() {
            self.restore_mode()?;
        }
        match &mut self.mode {
            #[cfg(unix)]
            ModeControl::Termios(guard) => *guard = Some(RawModeGuard::enter()?),
            ModeControl::Headless { raw } => *raw = true,
        }
        Ok(())
    }

    fn restore_mode(&mut self) -> io::Result<()> {
        match &mut self.mode {
            #[cfg(unix)]
            ModeControl::Termios(guard) => match guard.take() {
                Some(guard) => guard.restore(),
                None => Ok(()),
            },
            ModeControl::Headless { raw } => {
                *raw = false;
                Ok(())
            }
        }
    }

    fn is_raw(&self) -> bool {
        match &self.mode {
            #[cfg(unix)]
            ModeControl::Termios(guard) => guard.is_some(),
            ModeControl::Headless { raw } => *raw,
        }
    }

    fn input_encoding(&self) -> InputEncoding {
        InputEncoding::EscapeSequences
    }

    fn emergency_restore(&self) -> Option<EmergencyRestore> {
        match &self.mode {
            #[cfg(unix)]
            ModeControl::Termios(Some(guard)) => {
                let restore_termios = guard.emergency_restore().ok()?;
                Some(Box::new(move || {
                    let mut stdout = io::stdout();
                    let _ = stdout.write_all(CURSOR_SHOW);
                    let _ = stdout.flush();
                    restore_termios();
                }))
            }
            _ => None,
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl<W: Write, I: ByteSource> Drop for TtyConsole<W, I> {
    fn drop(&mut self) {
        if self.is_raw() {
            let _ = self.out.flush();
            let _ = self.restore_mode();
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use textscreen_core::console::ScriptedInput;
    use textscreen_core::key::KeyCode;
    use textscreen_core::key_decoder::KeyDecoder;

    fn headless(size: SizeSource) -> TtyConsole<Vec<u8>, ScriptedInput> {
        TtyConsole::headless(Vec::new(), ScriptedInput::new(), size)
    }

    #[test]
    fn cursor_is_clamped_to_fixed_size() {
        let mut c = headless(SizeSource::Fixed(ConsoleSize::new(10, 5)));
        c.set_cursor_pos(3, 2).unwrap();
        c.set_cursor_pos(-4, 99).unwrap();
        assert_eq!(c.get_ref().as_slice(), b"\x1b[3;4H\x1b[5;1H");
    }

    #[test]
    fn unavailable_size_reports_fallback() {
        let c = headless(SizeSource::Unavailable);
        assert_eq!(c.size(), ConsoleSize::FALLBACK);
        assert!(c.size().fallback);
    }

    #[test]
    fn headless_raw_mode_is_tracked_only() {
        let mut c = headless(SizeSource::Unavailable);
        assert!(!c.is_live());
        c.enter_raw_mode().unwrap();
        c.enter_raw_mode().unwrap();
        assert!(c.is_raw());
        c.restore_mode().unwrap();
        c.restore_mode().unwrap();
        assert!(!c.is_raw());
        assert!(c.emergency_restore().is_none());
        assert!(c.get_ref().is_empty());
    }

    #[test]
    fn clear_and_cursor_visibility_sequences() {
        let mut c = headless(SizeSource::Unavailable);
        c.clear_screen().unwrap();
        c.set_cursor_visible(false).unwrap();
        c.set_cursor_visible(true).unwrap();
        assert_eq!(c.get_ref().as_slice(), b"\x1b[2J\x1b[H\x1b[?25l\x1b[?25h");
    }

    // ── Live descriptors ──────────────────────────────────────────────

    /// Create a (reader_file, writer_stream) pair using Unix sockets.
    #[cfg(unix)]
    fn pipe_pair() -> (std::fs::File, std::os::unix::net::UnixStream) {
        use std::os::unix::net::UnixStream;
        let (a, b) = UnixStream::pair().unwrap();
        let reader: std::fs::File = std::os::fd::OwnedFd::from(a).into();
        (reader, b)
    }

    #[cfg(unix)]
    #[test]
    fn pipe_input_never_blocks() {
        let (reader, _writer) = pipe_pair();
        let mut input = TtyInput::from_file(reader);
        assert_eq!(input.read_byte().unwrap(), None);
        assert_eq!(input.read_byte().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn pipe_bytes_arrive_in_order() {
        let (reader, mut writer) = pipe_pair();
        let mut input = TtyInput::from_file(reader);
        writer.write_all(b"ab").unwrap();
        assert_eq!(input.read_byte().unwrap(), Some(b'a'));
        assert_eq!(input.read_byte().unwrap(), Some(b'b'));
        assert_eq!(input.read_byte().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn pipe_arrow_keys_decode() {
        let (reader, mut writer) = pipe_pair();
        let mut c = TtyConsole::headless(
            Vec::new(),
            TtyInput::from_file(reader),
            SizeSource::Unavailable,
        );
        let decoder = KeyDecoder::new(c.input_encoding());
        writer.write_all(b"\x1b[A").unwrap();
        assert_eq!(decoder.decode(&mut c).unwrap(), KeyCode::UP);
        writer.write_all(b"\x1b[1;5D").unwrap();
        assert_eq!(
            decoder.decode(&mut c).unwrap(),
            KeyCode::LEFT.with(textscreen_core::key::Modifiers::CTRL)
        );
        assert_eq!(decoder.decode(&mut c).unwrap(), KeyCode::NONE);
    }

    #[cfg(unix)]
    #[test]
    fn match_discards_the_rest_of_the_burst() {
        let (reader, mut writer) = pipe_pair();
        let mut c = TtyConsole::headless(
            Vec::new(),
            TtyInput::from_file(reader),
            SizeSource::Unavailable,
        );
        let decoder = KeyDecoder::new(c.input_encoding());
        writer.write_all(b"\x1b[Bxyz").unwrap();
        assert_eq!(decoder.decode(&mut c).unwrap(), KeyCode::DOWN);
        assert_eq!(decoder.decode(&mut c).unwrap(), KeyCode::NONE);
    }

    #[cfg(unix)]
    #[test]
    fn pty_window_size_is_reported() {
        let winsize = nix::pty::Winsize {
            ws_row: 30,
            ws_col: 100,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let Ok(pty) = nix::pty::openpty(Some(&winsize), None) else {
            return;
        };
        let source = SizeSource::Tty(std::fs::File::from(pty.slave));
        assert_eq!(source.query(), ConsoleSize::new(100, 30));
        drop(pty.master);
    }

    #[cfg(unix)]
    #[test]
    fn non_terminal_size_query_falls_back() {
        let (reader, _writer) = pipe_pair();
        let source = SizeSource::Tty(reader);
        assert_eq!(source.query(), ConsoleSize::FALLBACK);
    }
}
