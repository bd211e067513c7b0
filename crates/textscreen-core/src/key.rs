#![forbid(unsafe_code)]

//! Logical key codes.
//!
//! A [`KeyCode`] is a 32-bit value: the low 16 bits carry the base code, bit
//! 16 or 17 marks a position or function key, and bits 20..=22 carry the
//! modifiers. Masking with [`KEY_MASK`] yields the unmodified key.
//!
//! ```
//! use textscreen_core::key::{KeyCode, Modifiers};
//!
//! let key = KeyCode::LEFT | Modifiers::CTRL;
//! assert_eq!(key.base(), KeyCode::LEFT);
//! assert!(key.modifiers().contains(Modifiers::CTRL));
//! assert_eq!(key.to_string(), "Ctrl+Left");
//! ```

use bitflags::bitflags;
use std::fmt;
use std::ops::BitOr;

/// Key-class flag for cursor/navigation keys.
pub const POSITION_KEY: u32 = 0x0001_0000;
/// Key-class flag for function keys.
pub const FUNCTION_KEY: u32 = 0x0002_0000;
/// Base code plus key class.
pub const KEY_MASK: u32 = 0x000F_FFFF;
/// Modifier bits.
pub const MOD_MASK: u32 = 0x00F0_0000;

bitflags! {
    /// Modifier keys held during a key press.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        /// Shift key.
        const SHIFT = 0x0010_0000;
        /// Control key.
        const CTRL  = 0x0020_0000;
        /// Alt key.
        const ALT   = 0x0040_0000;
    }
}

/// One logical key, independent of how the host encoded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct KeyCode(u32);

impl KeyCode {
    /// No key available.
    pub const NONE: Self = Self(0);

    pub const BACKSPACE: Self = Self(0x08);
    pub const TAB: Self = Self(0x09);
    pub const ENTER: Self = Self(0x0D);
    pub const ESCAPE: Self = Self(0x1B);
    pub const DEL: Self = Self(0x7F);

    pub const LEFT: Self = Self::position(0x4B);
    pub const RIGHT: Self = Self::position(0x4D);
    pub const UP: Self = Self::position(0x48);
    pub const DOWN: Self = Self::position(0x50);
    pub const INSERT: Self = Self::position(0x52);
    pub const DELETE: Self = Self::position(0x53);
    pub const HOME: Self = Self::position(0x47);
    pub const END: Self = Self::position(0x4F);
    pub const PAGE_UP: Self = Self::position(0x49);
    pub const PAGE_DOWN: Self = Self::position(0x51);

    pub const F1: Self = Self::function_raw(0x41);
    pub const F2: Self = Self::function_raw(0x42);
    pub const F3: Self = Self::function_raw(0x43);
    pub const F4: Self = Self::function_raw(0x44);
    pub const F5: Self = Self::function_raw(0x45);
    pub const F6: Self = Self::function_raw(0x46);
    pub const F7: Self = Self::function_raw(0x47);
    pub const F8: Self = Self::function_raw(0x48);
    pub const F9: Self = Self::function_raw(0x49);
    pub const F10: Self = Self::function_raw(0x4A);
    pub const F11: Self = Self::function_raw(0x4B);
    pub const F12: Self = Self::function_raw(0x4C);

    /// Wrap a raw code.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// A position key with the given base code.
    #[inline]
    #[must_use]
    pub const fn position(base: u8) -> Self {
        Self(POSITION_KEY | base as u32)
    }

    const fn function_raw(base: u8) -> Self {
        Self(FUNCTION_KEY | base as u32)
    }

    /// Function key `F<n>` for `n` in `1..=12`.
    #[must_use]
    pub const fn function(n: u8) -> Option<Self> {
        if n >= 1 && n <= 12 {
            Some(Self::function_raw(0x40 + n))
        } else {
            None
        }
    }

    /// The key for a plain byte.
    #[inline]
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte as u32)
    }

    /// Raw 32-bit value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// The key with modifiers stripped.
    #[inline]
    #[must_use]
    pub const fn base(self) -> Self {
        Self(self.0 & KEY_MASK)
    }

    /// Modifiers held with this key.
    #[inline]
    #[must_use]
    pub const fn modifiers(self) -> Modifiers {
        Modifiers::from_bits_truncate(self.0 & MOD_MASK)
    }

    /// This key with extra modifiers.
    #[inline]
    #[must_use]
    pub const fn with(self, modifiers: Modifiers) -> Self {
        Self(self.0 | modifiers.bits())
    }

    #[inline]
    #[must_use]
    pub const fn is_position(self) -> bool {
        self.0 & POSITION_KEY != 0
    }

    #[inline]
    #[must_use]
    pub const fn is_function(self) -> bool {
        self.0 & FUNCTION_KEY != 0
    }

    /// The byte this key stands for, if it is a plain unmodified byte key.
    #[must_use]
    pub const fn as_byte(self) -> Option<u8> {
        if self.0 != 0 && self.0 <= 0xFF {
            Some(self.0 as u8)
        } else {
            None
        }
    }

    fn name(self) -> Option<&'static str> {
        let base = self.base();
        let name = match base {
            Self::BACKSPACE => "Backspace",
            Self::TAB => "Tab",
            Self::ENTER => "Enter",
            Self::ESCAPE => "Escape",
            Self::DEL => "Del",
            Self::LEFT => "Left",
            Self::RIGHT => "Right",
            Self::UP => "Up",
            Self::DOWN => "Down",
            Self::INSERT => "Insert",
            Self::DELETE => "Delete",
            Self::HOME => "Home",
            Self::END => "End",
            Self::PAGE_UP => "PageUp",
            Self::PAGE_DOWN => "PageDown",
            _ => return None,
        };
        Some(name)
    }
}

impl BitOr<Modifiers> for KeyCode {
    type Output = KeyCode;

    fn bitor(self, rhs: Modifiers) -> KeyCode {
        self.with(rhs)
    }
}

impl From<u8> for KeyCode {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("None");
        }
        let mods = self.modifiers();
        if mods.contains(Modifiers::CTRL) {
            f.write_str("Ctrl+")?;
        }
        if mods.contains(Modifiers::ALT) {
            f.write_str("Alt+")?;
        }
        if mods.contains(Modifiers::SHIFT) {
            f.write_str("Shift+")?;
        }
        let base = self.base();
        if let Some(name) = self.name() {
            f.write_str(name)
        } else if base.is_function() && (0x41..=0x4C).contains(&(base.0 & 0xFF)) {
            write!(f, "F{}", (base.0 & 0xFF) - 0x40)
        } else if let Some(b) = base.as_byte().filter(u8::is_ascii_graphic) {
            write!(f, "'{}'", b as char)
        } else {
            write!(f, "{:#x}", base.0)
        }
    }
}
