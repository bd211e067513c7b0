#![forbid(unsafe_code)]

//! Host key-sequence tables and the trie they compile into.
//!
//! Each backend encodes navigation and function keys differently. The raw
//! terminal sends ANSI escape sequences starting with ESC; the native console
//! sends a two-byte pair made of a 0xE0 or 0x00 prefix plus a scan code. Both
//! encodings are plain data here ([`ESCAPE_SEQUENCES`], [`SCAN_CODES`]) and are
//! compiled once into a [`KeyTrie`].
//!
//! # Invariants
//!
//! 1. Every sequence is 1..=[`MAX_SEQUENCE_LEN`] bytes long.
//! 2. When two entries share the same bytes, the first one wins.

use std::sync::OnceLock;

use crate::key::{KeyCode, Modifiers};

/// Longest sequence any table may contain.
pub const MAX_SEQUENCE_LEN: usize = 8;

/// One host-specific byte sequence and the logical key it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySequence {
    pub code: KeyCode,
    pub bytes: &'static [u8],
}

impl KeySequence {
    const fn new(code: KeyCode, bytes: &'static [u8]) -> Self {
        Self { code, bytes }
    }
}

const SHIFT: Modifiers = Modifiers::SHIFT;
const CTRL: Modifiers = Modifiers::CTRL;
const ALT: Modifiers = Modifiers::ALT;

const fn seq(code: KeyCode, bytes: &'static [u8]) -> KeySequence {
    KeySequence::new(code, bytes)
}

const fn modded(code: KeyCode, mods: Modifiers, bytes: &'static [u8]) -> KeySequence {
    KeySequence::new(code.with(mods), bytes)
}

// ---------------------------------------------------------------------------
// Raw terminal (xterm-style) escape sequences
// ---------------------------------------------------------------------------

/// Escape sequences sent by the raw terminal.
pub static ESCAPE_SEQUENCES: &[KeySequence] = &[
    seq(KeyCode::LEFT, b"\x1b[D"),
    seq(KeyCode::RIGHT, b"\x1b[C"),
    seq(KeyCode::UP, b"\x1b[A"),
    seq(KeyCode::DOWN, b"\x1b[B"),
    seq(KeyCode::INSERT, b"\x1b[2~"),
    seq(KeyCode::DELETE, b"\x1b[3~"),
    seq(KeyCode::HOME, b"\x1bOH"),
    seq(KeyCode::END, b"\x1bOF"),
    seq(KeyCode::PAGE_UP, b"\x1b[5~"),
    seq(KeyCode::PAGE_DOWN, b"\x1b[6~"),
    // vt220 home/end
    seq(KeyCode::HOME, b"\x1b[1~"),
    seq(KeyCode::END, b"\x1b[4~"),
    modded(KeyCode::LEFT, SHIFT, b"\x1b[1;2D"),
    modded(KeyCode::RIGHT, SHIFT, b"\x1b[1;2C"),
    modded(KeyCode::UP, SHIFT, b"\x1b[1;2A"),
    modded(KeyCode::DOWN, SHIFT, b"\x1b[1;2B"),
    modded(KeyCode::LEFT, CTRL, b"\x1b[1;5D"),
    modded(KeyCode::RIGHT, CTRL, b"\x1b[1;5C"),
    modded(KeyCode::UP, CTRL, b"\x1b[1;5A"),
    modded(KeyCode::DOWN, CTRL, b"\x1b[1;5B"),
    modded(KeyCode::LEFT, ALT, b"\x1b[1;3D"),
    modded(KeyCode::RIGHT, ALT, b"\x1b[1;3C"),
    modded(KeyCode::UP, ALT, b"\x1b[1;3A"),
    modded(KeyCode::DOWN, ALT, b"\x1b[1;3B"),
    modded(KeyCode::PAGE_UP, CTRL, b"\x1b[5;5~"),
    modded(KeyCode::PAGE_DOWN, CTRL, b"\x1b[6;5~"),
    modded(KeyCode::PAGE_UP, ALT, b"\x1b[5;3~"),
    modded(KeyCode::PAGE_DOWN, ALT, b"\x1b[6;3~"),
    modded(KeyCode::INSERT, ALT, b"\x1b[2;3~"),
    modded(KeyCode::DELETE, SHIFT, b"\x1b[3;2~"),
    modded(KeyCode::DELETE, CTRL, b"\x1b[3;5~"),
    modded(KeyCode::DELETE, ALT, b"\x1b[3;3~"),
    modded(KeyCode::TAB, SHIFT, b"\x1b[Z"),
    seq(KeyCode::F1, b"\x1bOP"),
    seq(KeyCode::F2, b"\x1bOQ"),
    seq(KeyCode::F3, b"\x1bOR"),
    seq(KeyCode::F4, b"\x1bOS"),
    seq(KeyCode::F5, b"\x1b[15~"),
    seq(KeyCode::F6, b"\x1b[17~"),
    seq(KeyCode::F7, b"\x1b[18~"),
    seq(KeyCode::F8, b"\x1b[19~"),
    seq(KeyCode::F9, b"\x1b[20~"),
    seq(KeyCode::F10, b"\x1b[21~"),
    seq(KeyCode::F11, b"\x1b[23~"),
    seq(KeyCode::F12, b"\x1b[24~"),
];

// ---------------------------------------------------------------------------
// Native console scan codes
// ---------------------------------------------------------------------------

/// Prefix byte for extended (grey) keys.
pub const EXTENDED_PREFIX: u8 = 0xE0;
/// Prefix byte for function and keypad keys.
pub const FUNCTION_PREFIX: u8 = 0x00;

/// Scan-code pairs and single bytes delivered by the native console.
pub static SCAN_CODES: &[KeySequence] = &[
    seq(KeyCode::LEFT, &[0xE0, 0x4B]),
    seq(KeyCode::RIGHT, &[0xE0, 0x4D]),
    seq(KeyCode::UP, &[0xE0, 0x48]),
    seq(KeyCode::DOWN, &[0xE0, 0x50]),
    seq(KeyCode::INSERT, &[0xE0, 0x52]),
    seq(KeyCode::DELETE, &[0xE0, 0x53]),
    seq(KeyCode::HOME, &[0xE0, 0x47]),
    seq(KeyCode::END, &[0xE0, 0x4F]),
    seq(KeyCode::PAGE_UP, &[0xE0, 0x49]),
    seq(KeyCode::PAGE_DOWN, &[0xE0, 0x51]),
    seq(KeyCode::F1, &[0x00, 0x3B]),
    seq(KeyCode::F2, &[0x00, 0x3C]),
    seq(KeyCode::F3, &[0x00, 0x3D]),
    seq(KeyCode::F4, &[0x00, 0x3E]),
    seq(KeyCode::F5, &[0x00, 0x3F]),
    seq(KeyCode::F6, &[0x00, 0x40]),
    seq(KeyCode::F7, &[0x00, 0x41]),
    seq(KeyCode::F8, &[0x00, 0x42]),
    seq(KeyCode::F9, &[0x00, 0x43]),
    seq(KeyCode::F10, &[0x00, 0x44]),
    seq(KeyCode::F11, &[0xE0, 0x85]),
    seq(KeyCode::F12, &[0xE0, 0x86]),
    modded(KeyCode::LEFT, CTRL, &[0xE0, 0x73]),
    modded(KeyCode::RIGHT, CTRL, &[0xE0, 0x74]),
    modded(KeyCode::UP, CTRL, &[0xE0, 0x8D]),
    modded(KeyCode::DOWN, CTRL, &[0xE0, 0x91]),
    modded(KeyCode::LEFT, ALT, &[0x00, 0x9B]),
    modded(KeyCode::RIGHT, ALT, &[0x00, 0x9D]),
    modded(KeyCode::UP, ALT, &[0x00, 0x98]),
    modded(KeyCode::DOWN, ALT, &[0x00, 0xA0]),
    modded(KeyCode::INSERT, CTRL, &[0xE0, 0x92]),
    modded(KeyCode::DELETE, CTRL, &[0xE0, 0x93]),
    modded(KeyCode::HOME, CTRL, &[0xE0, 0x77]),
    modded(KeyCode::END, CTRL, &[0xE0, 0x75]),
    // Shadowed by F12 above.
    modded(KeyCode::PAGE_UP, CTRL, &[0xE0, 0x86]),
    modded(KeyCode::PAGE_DOWN, CTRL, &[0xE0, 0x76]),
    modded(KeyCode::INSERT, ALT, &[0x00, 0xA2]),
    modded(KeyCode::DELETE, ALT, &[0x00, 0xA3]),
    modded(KeyCode::HOME, ALT, &[0x00, 0x97]),
    modded(KeyCode::END, ALT, &[0x00, 0x9F]),
    modded(KeyCode::PAGE_UP, ALT, &[0x00, 0x99]),
    modded(KeyCode::PAGE_DOWN, ALT, &[0x00, 0xA1]),
    modded(KeyCode::ENTER, CTRL, &[0x0A]),
    modded(KeyCode::BACKSPACE, CTRL, &[0x7F]),
    // A plain 0xE0 byte (Latin-1 'à') doubled so it never reads as a prefix.
    seq(KeyCode::from_byte(EXTENDED_PREFIX), &[0xE0, 0xE0]),
    // keypad
    seq(KeyCode::LEFT, &[0x00, 0x4B]),
    seq(KeyCode::RIGHT, &[0x00, 0x4D]),
    seq(KeyCode::UP, &[0x00, 0x48]),
    seq(KeyCode::DOWN, &[0x00, 0x50]),
    seq(KeyCode::HOME, &[0x00, 0x47]),
    seq(KeyCode::END, &[0x00, 0x4F]),
    seq(KeyCode::PAGE_UP, &[0x00, 0x49]),
    seq(KeyCode::PAGE_DOWN, &[0x00, 0x51]),
    modded(KeyCode::LEFT, CTRL, &[0x00, 0x73]),
    modded(KeyCode::RIGHT, CTRL, &[0x00, 0x74]),
    modded(KeyCode::UP, CTRL, &[0x00, 0x8D]),
    modded(KeyCode::DOWN, CTRL, &[0x00, 0x91]),
    modded(KeyCode::HOME, CTRL, &[0x00, 0x77]),
    modded(KeyCode::END, CTRL, &[0x00, 0x75]),
    modded(KeyCode::PAGE_UP, CTRL, &[0x00, 0x86]),
    modded(KeyCode::PAGE_DOWN, CTRL, &[0x00, 0x76]),
    modded(KeyCode::F1, SHIFT, &[0x00, 0x54]),
    modded(KeyCode::F2, SHIFT, &[0x00, 0x55]),
    modded(KeyCode::F3, SHIFT, &[0x00, 0x56]),
    modded(KeyCode::F4, SHIFT, &[0x00, 0x57]),
    modded(KeyCode::F5, SHIFT, &[0x00, 0x58]),
    modded(KeyCode::F6, SHIFT, &[0x00, 0x59]),
    modded(KeyCode::F7, SHIFT, &[0x00, 0x5A]),
    modded(KeyCode::F8, SHIFT, &[0x00, 0x5B]),
    modded(KeyCode::F9, SHIFT, &[0x00, 0x5C]),
    modded(KeyCode::F10, SHIFT, &[0x00, 0x5D]),
    modded(KeyCode::F11, SHIFT, &[0xE0, 0x87]),
    modded(KeyCode::F12, SHIFT, &[0xE0, 0x88]),
    modded(KeyCode::F1, CTRL, &[0x00, 0x5E]),
    modded(KeyCode::F2, CTRL, &[0x00, 0x5F]),
    modded(KeyCode::F3, CTRL, &[0x00, 0x60]),
    modded(KeyCode::F4, CTRL, &[0x00, 0x61]),
    modded(KeyCode::F5, CTRL, &[0x00, 0x62]),
    modded(KeyCode::F6, CTRL, &[0x00, 0x63]),
    modded(KeyCode::F7, CTRL, &[0x00, 0x64]),
    modded(KeyCode::F8, CTRL, &[0x00, 0x65]),
    modded(KeyCode::F9, CTRL, &[0x00, 0x66]),
    modded(KeyCode::F10, CTRL, &[0x00, 0x67]),
    modded(KeyCode::F11, CTRL, &[0xE0, 0x89]),
    modded(KeyCode::F12, CTRL, &[0xE0, 0x8A]),
    modded(KeyCode::F1, ALT, &[0x00, 0x68]),
    modded(KeyCode::F2, ALT, &[0x00, 0x69]),
    modded(KeyCode::F3, ALT, &[0x00, 0x6A]),
    modded(KeyCode::F4, ALT, &[0x00, 0x6B]),
    modded(KeyCode::F5, ALT, &[0x00, 0x6C]),
    modded(KeyCode::F6, ALT, &[0x00, 0x6D]),
    modded(KeyCode::F7, ALT, &[0x00, 0x6E]),
    modded(KeyCode::F8, ALT, &[0x00, 0x6F]),
    modded(KeyCode::F9, ALT, &[0x00, 0x70]),
    modded(KeyCode::F10, ALT, &[0x00, 0x71]),
    modded(KeyCode::F11, ALT, &[0xE0, 0x8B]),
    modded(KeyCode::F12, ALT, &[0xE0, 0x8C]),
];

// ---------------------------------------------------------------------------
// Trie
// ---------------------------------------------------------------------------

/// Result of looking a byte prefix up in a [`KeyTrie`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrieLookup {
    /// The bytes are a complete sequence.
    Match(KeyCode),
    /// The bytes start at least one longer sequence.
    Prefix,
    /// No sequence starts with these bytes.
    Miss,
}

#[derive(Debug, Default, Clone)]
struct Node {
    code: Option<KeyCode>,
    // Sorted by byte.
    children: Vec<(u8, usize)>,
}

impl Node {
    fn child(&self, byte: u8) -> Option<usize> {
        self.children
            .binary_search_by_key(&byte, |&(b, _)| b)
            .ok()
            .map(|i| self.children[i].1)
    }
}

/// Byte-keyed prefix tree over a sequence table.
///
/// Lookup costs one step per byte regardless of table size.
#[derive(Debug, Clone)]
pub struct KeyTrie {
    nodes: Vec<Node>,
    entries: &'static [KeySequence],
    max_len: usize,
}

impl KeyTrie {
    /// Compile a table. Empty and over-long sequences are skipped.
    #[must_use]
    pub fn build(entries: &'static [KeySequence]) -> Self {
        let mut nodes = vec![Node::default()];
        let mut max_len = 0;
        for entry in entries {
            if entry.bytes.is_empty() || entry.bytes.len() > MAX_SEQUENCE_LEN {
                continue;
            }
            let mut at = 0;
            for &byte in entry.bytes {
                at = match nodes[at].child(byte) {
                    Some(next) => next,
                    None => {
                        let next = nodes.len();
                        nodes.push(Node::default());
                        let children = &mut nodes[at].children;
                        let pos = children.partition_point(|&(b, _)| b < byte);
                        children.insert(pos, (byte, next));
                        next
                    }
                };
            }
            if nodes[at].code.is_none() {
                nodes[at].code = Some(entry.code);
            }
            max_len = max_len.max(entry.bytes.len());
        }
        Self {
            nodes,
            entries,
            max_len,
        }
    }

    /// Classify `bytes` against the table.
    #[must_use]
    pub fn lookup(&self, bytes: &[u8]) -> TrieLookup {
        let mut at = 0;
        for &byte in bytes {
            match self.nodes[at].child(byte) {
                Some(next) => at = next,
                None => return TrieLookup::Miss,
            }
        }
        match self.nodes[at].code {
            Some(code) if !bytes.is_empty() => TrieLookup::Match(code),
            _ if self.nodes[at].children.is_empty() => TrieLookup::Miss,
            _ => TrieLookup::Prefix,
        }
    }

    /// The exact-match code for `bytes`, if any.
    #[must_use]
    pub fn get(&self, bytes: &[u8]) -> Option<KeyCode> {
        match self.lookup(bytes) {
            TrieLookup::Match(code) => Some(code),
            _ => None,
        }
    }

    /// First byte sequence that encodes `code`.
    #[must_use]
    pub fn sequence_for(&self, code: KeyCode) -> Option<&'static [u8]> {
        self.entries
            .iter()
            .find(|e| e.code == code && self.get(e.bytes) == Some(code))
            .map(|e| e.bytes)
    }

    /// Length of the longest sequence.
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

/// Compiled [`ESCAPE_SEQUENCES`].
pub fn escape_trie() -> &'static KeyTrie {
    static TRIE: OnceLock<KeyTrie> = OnceLock::new();
    TRIE.get_or_init(|| KeyTrie::build(ESCAPE_SEQUENCES))
}

/// Compiled [`SCAN_CODES`].
pub fn scan_code_trie() -> &'static KeyTrie {
    static TRIE: OnceLock<KeyTrie> = OnceLock::new();
    TRIE.get_or_init(|| KeyTrie::build(SCAN_CODES))
}
