#![forbid(unsafe_code)]

//! Per-poll key decoder.
//!
//! Each call to [`KeyDecoder::decode`] consumes whatever one key press put on
//! the input and yields exactly one [`KeyCode`], or [`KeyCode::NONE`] when
//! nothing usable is pending. Nothing is carried between calls: a sequence
//! whose tail has not arrived yet is abandoned and its head is lost.
//!
//! # Escape sequences
//!
//! ```text
//! read b ── none ──────────────────────────────► NONE
//!   │ b == LF ─────────────────────────────────► ENTER
//!   │ b != ESC ────────────────────────────────► b
//!   ▼ ESC
//! read next ── none on first read ─────────────► ESCAPE
//!   │         ── none later ───────────────────► NONE
//!   ▼
//! exact match? ── yes ── drain pending ────────► code
//!   │ no, and fewer than 6 bytes read: loop
//!   ▼
//! drain pending ───────────────────────────────► NONE
//! ```
//!
//! # Scan codes
//!
//! A 0xE0 or 0x00 prefix is followed by exactly one scan-code byte. Unknown
//! pairs decode to `POSITION_KEY | scan`.

use std::io;

use crate::console::{ByteSource, InputEncoding};
use crate::key::{KeyCode, POSITION_KEY};
use crate::key_table::{
    EXTENDED_PREFIX, FUNCTION_PREFIX, KeyTrie, MAX_SEQUENCE_LEN, TrieLookup, escape_trie,
    scan_code_trie,
};

const ESC: u8 = 0x1B;
const LF: u8 = 0x0A;

/// Longest escape sequence the decoder will accumulate, ESC included.
pub const ESCAPE_SEQUENCE_BOUND: usize = 6;

/// Stateless-between-polls key decoder for one input encoding.
#[derive(Debug, Clone, Copy)]
pub struct KeyDecoder {
    encoding: InputEncoding,
    trie: &'static KeyTrie,
}

impl KeyDecoder {
    #[must_use]
    pub fn new(encoding: InputEncoding) -> Self {
        let trie = match encoding {
            InputEncoding::EscapeSequences => escape_trie(),
            InputEncoding::ScanCodes => scan_code_trie(),
        };
        Self { encoding, trie }
    }

    #[must_use]
    pub fn encoding(&self) -> InputEncoding {
        self.encoding
    }

    /// Decode at most one key from `input` without blocking.
    pub fn decode<S: ByteSource + ?Sized>(&self, input: &mut S) -> io::Result<KeyCode> {
        match self.encoding {
            InputEncoding::EscapeSequences => self.decode_escape(input),
            InputEncoding::ScanCodes => self.decode_scan_code(input),
        }
    }

    fn decode_escape<S: ByteSource + ?Sized>(&self, input: &mut S) -> io::Result<KeyCode> {
        let Some(first) = input.read_byte()? else {
            return Ok(KeyCode::NONE);
        };
        match first {
            LF => return Ok(KeyCode::ENTER),
            ESC => {}
            other => return Ok(KeyCode::from_byte(other)),
        }

        let mut seq = [0u8; MAX_SEQUENCE_LEN];
        seq[0] = ESC;
        for len in 2..=ESCAPE_SEQUENCE_BOUND {
            let Some(byte) = input.read_byte()? else {
                return Ok(if len == 2 {
                    KeyCode::ESCAPE
                } else {
                    crate::trace!(len, "escape sequence abandoned");
                    KeyCode::NONE
                });
            };
            seq[len - 1] = byte;
            match self.trie.lookup(&seq[..len]) {
                TrieLookup::Match(code) => {
                    input.drain()?;
                    return Ok(code);
                }
                // Keep reading until the bound even on a miss, so the whole
                // unrecognized sequence is consumed.
                TrieLookup::Prefix | TrieLookup::Miss => {}
            }
        }
        crate::trace!(bytes = ?&seq[..ESCAPE_SEQUENCE_BOUND], "unrecognized escape sequence");
        input.drain()?;
        Ok(KeyCode::NONE)
    }

    fn decode_scan_code<S: ByteSource + ?Sized>(&self, input: &mut S) -> io::Result<KeyCode> {
        let Some(first) = input.read_byte()? else {
            return Ok(KeyCode::NONE);
        };
        if first == EXTENDED_PREFIX || first == FUNCTION_PREFIX {
            let Some(scan) = input.read_byte()? else {
                return Ok(KeyCode::NONE);
            };
            return Ok(self
                .trie
                .get(&[first, scan])
                .unwrap_or(KeyCode::new(POSITION_KEY | u32::from(scan))));
        }
        Ok(self
            .trie
            .get(&[first])
            .unwrap_or(KeyCode::from_byte(first)))
    }
}
