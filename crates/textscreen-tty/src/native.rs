#![forbid(unsafe_code)]

//! Native-console backend on crossterm.
//!
//! Keyboard events are re-encoded as the byte stream a classic console
//! delivers: plain keys as their byte, special keys as a 0xE0/0x00 prefix
//! followed by a scan code. The encoding comes from [`SCAN_CODES`] in reverse,
//! so the [`KeyDecoder`] sees exactly what it would on such a console.
//!
//! [`SCAN_CODES`]: textscreen_core::key_table::SCAN_CODES
//! [`KeyDecoder`]: textscreen_core::key_decoder::KeyDecoder

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

use crossterm::event::{Event, KeyCode as CtKey, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, queue, terminal};
use textscreen_core::console::{
    ByteSource, Console, ConsoleSize, EmergencyRestore, InputEncoding,
};
use textscreen_core::key::{KeyCode, Modifiers};
use textscreen_core::key_table::{EXTENDED_PREFIX, FUNCTION_PREFIX, scan_code_trie};

/// Byte Ctrl+C produces when it arrives as input.
pub const CTRL_C: u8 = 0x03;

// ── Events ───────────────────────────────────────────────────────────────

/// Non-blocking supplier of terminal events.
pub trait EventSource {
    /// The next event if one is ready. Must never block.
    fn next_event(&mut self) -> io::Result<Option<Event>>;
}

/// Live events from crossterm's reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstermEvents;

impl EventSource for CrosstermEvents {
    fn next_event(&mut self) -> io::Result<Option<Event>> {
        if crossterm::event::poll(Duration::ZERO)? {
            crossterm::event::read().map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Queue of prepared events.
#[derive(Debug, Default, Clone)]
pub struct ScriptedEvents {
    queue: VecDeque<Event>,
}

impl ScriptedEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    /// Queue a key press.
    pub fn press(&mut self, code: CtKey, modifiers: KeyModifiers) {
        self.push(Event::Key(KeyEvent::new(code, modifiers)));
    }
}

impl EventSource for ScriptedEvents {
    fn next_event(&mut self) -> io::Result<Option<Event>> {
        Ok(self.queue.pop_front())
    }
}

// ── Key encoding ─────────────────────────────────────────────────────────

fn map_modifiers(modifiers: KeyModifiers) -> Modifiers {
    let mut mapped = Modifiers::empty();
    if modifiers.contains(KeyModifiers::SHIFT) {
        mapped |= Modifiers::SHIFT;
    }
    if modifiers.contains(KeyModifiers::CONTROL) {
        mapped |= Modifiers::CTRL;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        mapped |= Modifiers::ALT;
    }
    mapped
}

fn special_key(code: CtKey) -> Option<KeyCode> {
    Some(match code {
        CtKey::Left => KeyCode::LEFT,
        CtKey::Right => KeyCode::RIGHT,
        CtKey::Up => KeyCode::UP,
        CtKey::Down => KeyCode::DOWN,
        CtKey::Insert => KeyCode::INSERT,
        CtKey::Delete => KeyCode::DELETE,
        CtKey::Home => KeyCode::HOME,
        CtKey::End => KeyCode::END,
        CtKey::PageUp => KeyCode::PAGE_UP,
        CtKey::PageDown => KeyCode::PAGE_DOWN,
        CtKey::F(n) => KeyCode::function(n)?,
        _ => return None,
    })
}

/// Append the console bytes for one key event. Releases and keys without a
/// console encoding produce nothing. Characters equal to a prefix byte are
/// never sent bare: 0xE0 goes out doubled and NUL is dropped.
pub fn encode_key(key: &KeyEvent, out: &mut VecDeque<u8>) {
    if key.kind == KeyEventKind::Release {
        return;
    }
    let mods = map_modifiers(key.modifiers);
    let ctrl = mods.contains(Modifiers::CTRL);
    let trie = scan_code_trie();
    match key.code {
        CtKey::Char(c) => {
            let Ok(byte) = u8::try_from(u32::from(c)) else {
                return;
            };
            match byte {
                // NUL has no key code.
                FUNCTION_PREFIX => {}
                EXTENDED_PREFIX => {
                    if let Some(bytes) = trie.sequence_for(KeyCode::from_byte(byte)) {
                        out.extend(bytes);
                    }
                }
                _ if ctrl && byte.is_ascii_alphabetic() => out.push_back(byte & 0x1F),
                _ => out.push_back(byte),
            }
        }
        CtKey::Enter if ctrl => out.extend(
            trie.sequence_for(KeyCode::ENTER.with(Modifiers::CTRL))
                .unwrap_or(&[0x0A]),
        ),
        CtKey::Enter => out.push_back(0x0D),
        CtKey::Backspace if ctrl => out.extend(
            trie.sequence_for(KeyCode::BACKSPACE.with(Modifiers::CTRL))
                .unwrap_or(&[0x7F]),
        ),
        CtKey::Backspace => out.push_back(0x08),
        CtKey::Tab => out.push_back(0x09),
        CtKey::BackTab => out.extend([FUNCTION_PREFIX, 0x0F]),
        CtKey::Esc => out.push_back(0x1B),
        code => {
            let Some(base) = special_key(code) else {
                return;
            };
            let bytes = trie
                .sequence_for(base.with(mods))
                .or_else(|| trie.sequence_for(base));
            if let Some(bytes) = bytes {
                out.extend(bytes);
            }
        }
    }
}

// ── Console ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum NativeSize {
    Live,
    Fixed(ConsoleSize),
    Unavailable,
}

/// Native-console backend.
///
/// Input is scan-code encoded and Ctrl+C arrives as byte 0x03 rather than a
/// signal, see [`Console::interrupts_via_input`].
pub struct NativeConsole<W: Write, E: EventSource> {
    out: W,
    events: E,
    pending: VecDeque<u8>,
    size: NativeSize,
    live: bool,
    raw: bool,
}

impl NativeConsole<io::Stdout, CrosstermEvents> {
    /// The process console. Raw mode is entered separately.
    #[must_use]
    pub fn open() -> Self {
        Self {
            out: io::stdout(),
            events: CrosstermEvents,
            pending: VecDeque::new(),
            size: NativeSize::Live,
            live: true,
            raw: false,
        }
    }
}

impl<W: Write, E: EventSource> NativeConsole<W, E> {
    /// A console that never touches the terminal. `None` makes every size
    /// query fail.
    #[must_use]
    pub fn headless(out: W, events: E, size: Option<ConsoleSize>) -> Self {
        Self {
            out,
            events,
            pending: VecDeque::new(),
            size: size.map_or(NativeSize::Unavailable, NativeSize::Fixed),
            live: false,
            raw: false,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Pull events until at least one byte is pending or none are ready.
    fn refill(&mut self) -> io::Result<()> {
        while self.pending.is_empty() {
            match self.events.next_event()? {
                Some(Event::Key(key)) => encode_key(&key, &mut self.pending),
                Some(_) => {}
                None => break,
            }
        }
        Ok(())
    }
}

impl<W: Write, E: EventSource> ByteSource for NativeConsole<W, E> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.refill()?;
        Ok(self.pending.pop_front())
    }

    fn drain(&mut self) -> io::Result<()> {
        self.pending.clear();
        while self.events.next_event()?.is_some() {}
        Ok(())
    }
}

impl<W: Write, E: EventSource> Console for NativeConsole<W, E> {
    fn size(&self) -> ConsoleSize {
        match self.size {
            NativeSize::Live => match terminal::size() {
                Ok((w, h)) => ConsoleSize::or_fallback(w, h),
                Err(_) => {
                    textscreen_core::debug!("console size unavailable, using fallback");
                    ConsoleSize::FALLBACK
                }
            },
            NativeSize::Fixed(size) => size,
            NativeSize::Unavailable => ConsoleSize::FALLBACK,
        }
    }

    fn set_cursor_pos(&mut self, x: i32, y: i32) -> io::Result<()> {
        let (x, y) = self.size().clamp(x, y);
        queue!(self.out, cursor::MoveTo(x, y))
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        if visible {
            queue!(self.out, cursor::Show)
        } else {
            queue!(self.out, cursor::Hide)
        }
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            terminal::Clear(terminal::ClearType::All),
            cursor::MoveTo(0, 0)
        )
    }

    fn enter_raw_mode(&mut self) -> io::Result<()> {
        if self.raw {
            self.restore_mode()?;
        }
        if self.live {
            terminal::enable_raw_mode()?;
            textscreen_core::info!("native raw mode entered");
        }
        self.raw = true;
        Ok(())
    }

    fn restore_mode(&mut self) -> io::Result<()> {
        if !self.raw {
            return Ok(());
        }
        self.raw = false;
        if self.live {
            terminal::disable_raw_mode()?;
            textscreen_core::info!("native raw mode restored");
        }
        Ok(())
    }

    fn is_raw(&self) -> bool {
        self.raw
    }

    fn input_encoding(&self) -> InputEncoding {
        InputEncoding::ScanCodes
    }

    fn interrupts_via_input(&self) -> bool {
        true
    }

    fn emergency_restore(&self) -> Option<EmergencyRestore> {
        if !(self.live && self.raw) {
            return None;
        }
        Some(Box::new(|| {
            let mut stdout = io::stdout();
            let _ = crossterm::execute!(stdout, cursor::Show);
            let _ = terminal::disable_raw_mode();
        }))
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Positions every row directly while the frame fits above the bottom row
    /// and within the width. Otherwise rows go out line by line, so the
    /// terminal wraps and scrolls as it does for the other strategies.
    fn write_rows(&mut self, origin_row: u16, rows: &[&[u8]]) -> io::Result<()> {
        let size = self.size();
        let end = usize::from(origin_row) + rows.len();
        let fits = end < usize::from(size.height)
            && rows.iter().all(|row| row.len() <= usize::from(size.width));
        if !fits {
            for _ in 0..origin_row {
                self.out.write_all(b"\r\n")?;
            }
            for row in rows {
                self.out.write_all(row)?;
                self.out.write_all(b"\r\n")?;
            }
            return Ok(());
        }

        let mut y = origin_row;
        for row in rows {
            queue!(self.out, cursor::MoveTo(0, y))?;
            self.out.write_all(row)?;
            y += 1;
        }
        queue!(self.out, cursor::MoveTo(0, y))
    }
}

impl<W: Write, E: EventSource> Drop for NativeConsole<W, E> {
    fn drop(&mut self) {
        let _ = self.out.flush();
        let _ = self.restore_mode();
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
