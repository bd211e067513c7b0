#![forbid(unsafe_code)]

//! Screen settings.
//!
//! A [`Settings`] value describes how bitmaps map onto the console: the
//! visible width and height, the margins around them, the byte treated as
//! "empty", the aspect-ratio correction used by curve drawing, the output
//! strategy and the display translate table.
//!
//! # Invariants
//!
//! 1. `sar()` is always within `[MIN_SAR, MAX_SAR]`. The field is private and
//!    every setter clamps; NaN falls back to [`DEFAULT_SAR`].
//! 2. The translate table always has 256 entries.
//!
//! # Environment overrides
//!
//! | Variable | Values |
//! |----------|--------|
//! | `TEXTSCREEN_RENDERING` | `fast`, `normal`, `slow`, `native` |
//! | `TEXTSCREEN_SAR` | decimal, clamped to `[0.1, 10.0]` |
//! | `TEXTSCREEN_SPACE` | a single ASCII character |
//!
//! Unparseable values are ignored.

use std::env;
use std::fmt;

/// Default top margin in rows.
pub const DEFAULT_TOP_MARGIN: i32 = 1;
/// Default left margin in columns.
pub const DEFAULT_LEFT_MARGIN: i32 = 2;
/// Default sample aspect ratio (terminal cells are roughly twice as tall as wide).
pub const DEFAULT_SAR: f64 = 2.0;
/// Default space byte.
pub const DEFAULT_SPACE: u8 = b' ';
/// Smallest accepted sample aspect ratio.
pub const MIN_SAR: f64 = 0.1;
/// Largest accepted sample aspect ratio.
pub const MAX_SAR: f64 = 10.0;

/// Output strategy used when presenting a bitmap.
///
/// All strategies produce the same character grid and leave the cursor in the
/// same place; they differ only in how the output is chunked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMethod {
    /// Build the whole frame and write it once.
    #[default]
    Fast,
    /// One write per row.
    Normal,
    /// One write per byte, yielding the thread after each row.
    Slow,
    /// Hand the rows to the backend's native bulk output.
    Native,
}

impl RenderMethod {
    /// Every method, in index order.
    pub const ALL: [Self; 4] = [Self::Fast, Self::Normal, Self::Slow, Self::Native];

    /// Method for a numeric index (0 = fast .. 3 = native).
    #[must_use]
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Lowercase name, as accepted by [`RenderMethod::parse`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Normal => "normal",
            Self::Slow => "slow",
            Self::Native => "native",
        }
    }

    /// Parse a method name (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(value))
    }
}

/// 256-entry byte to display-byte mapping applied at render time.
#[derive(Clone, PartialEq, Eq)]
pub struct TranslateTable([u8; 256]);

impl TranslateTable {
    /// Table mapping every byte to itself.
    #[must_use]
    pub const fn identity() -> Self {
        let mut table = [0u8; 256];
        let mut i = 0;
        while i < 256 {
            table[i] = i as u8;
            i += 1;
        }
        Self(table)
    }

    /// Default table: control codes, DEL and `0xFD..=0xFF` display as space.
    #[must_use]
    pub const fn printable() -> Self {
        let mut table = Self::identity().0;
        let mut i = 0;
        while i < 256 {
            if i < 0x20 || i == 0x7F || i >= 0xFD {
                table[i] = b' ';
            }
            i += 1;
        }
        Self(table)
    }

    /// Build from an explicit table.
    #[must_use]
    pub const fn from_bytes(table: [u8; 256]) -> Self {
        Self(table)
    }

    /// Display byte for a cell value.
    #[inline]
    #[must_use]
    pub const fn translate(&self, byte: u8) -> u8 {
        self.0[byte as usize]
    }

    /// Remap one byte.
    pub fn set(&mut self, from: u8, to: u8) {
        self.0[from as usize] = to;
    }

    /// The raw table.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 256] {
        &self.0
    }
}

impl Default for TranslateTable {
    fn default() -> Self {
        Self::printable()
    }
}

impl fmt::Debug for TranslateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let remapped = (0..=255u8).filter(|&b| self.translate(b) != b).count();
        f.debug_struct("TranslateTable")
            .field("remapped", &remapped)
            .finish()
    }
}

/// Active screen settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Byte used for clearing and as the transparent value for overlays.
    pub space: u8,
    /// Visible width in cells.
    pub width: i32,
    /// Visible height in cells.
    pub height: i32,
    /// Blank rows above the visible area.
    pub top_margin: i32,
    /// Blank columns left of the visible area.
    pub left_margin: i32,
    sar: f64,
    /// Output strategy.
    pub rendering: RenderMethod,
    /// Display translate table.
    pub translate: TranslateTable,
}

impl Settings {
    /// Default settings for a console of `cols` x `rows`.
    ///
    /// The visible area is the console minus the default margins on both sides.
    #[must_use]
    pub fn for_console(cols: u16, rows: u16) -> Self {
        Self {
            space: DEFAULT_SPACE,
            width: i32::from(cols) - DEFAULT_LEFT_MARGIN * 2,
            height: i32::from(rows) - DEFAULT_TOP_MARGIN * 2,
            top_margin: DEFAULT_TOP_MARGIN,
            left_margin: DEFAULT_LEFT_MARGIN,
            sar: DEFAULT_SAR,
            rendering: RenderMethod::default(),
            translate: TranslateTable::default(),
        }
    }

    /// Sample aspect ratio, always within `[MIN_SAR, MAX_SAR]`.
    #[inline]
    #[must_use]
    pub fn sar(&self) -> f64 {
        self.sar
    }

    /// Set the sample aspect ratio, returning the clamped value that was stored.
    pub fn set_sar(&mut self, sar: f64) -> f64 {
        self.sar = clamp_sar(sar);
        self.sar
    }

    /// Builder form of [`Settings::set_sar`].
    #[must_use]
    pub fn with_sar(mut self, sar: f64) -> Self {
        self.set_sar(sar);
        self
    }

    /// Whether a visible area has been configured.
    #[must_use]
    pub fn has_screen_size(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Apply `TEXTSCREEN_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(&EnvOverrides::from_env())
    }

    /// Apply overrides from an explicit set of inputs.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &EnvOverrides) -> Self {
        if let Some(method) = overrides.rendering.as_deref().and_then(RenderMethod::parse) {
            self.rendering = method;
        }
        if let Some(sar) = overrides
            .sar
            .as_deref()
            .and_then(|s| s.trim().parse::<f64>().ok())
        {
            self.set_sar(sar);
        }
        if let Some(space) = overrides.space.as_deref().and_then(single_byte) {
            self.space = space;
        }
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::for_console(80, 25)
    }
}

/// Clamp a sample aspect ratio into the accepted range.
#[must_use]
pub fn clamp_sar(sar: f64) -> f64 {
    if sar.is_nan() {
        DEFAULT_SAR
    } else {
        sar.clamp(MIN_SAR, MAX_SAR)
    }
}

fn single_byte(value: &str) -> Option<u8> {
    match value.as_bytes() {
        [b] if b.is_ascii() => Some(*b),
        _ => None,
    }
}

/// Raw override inputs, normally read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// `TEXTSCREEN_RENDERING`
    pub rendering: Option<String>,
    /// `TEXTSCREEN_SAR`
    pub sar: Option<String>,
    /// `TEXTSCREEN_SPACE`
    pub space: Option<String>,
}

impl EnvOverrides {
    /// Read the overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            rendering: env::var("TEXTSCREEN_RENDERING").ok(),
            sar: env::var("TEXTSCREEN_SAR").ok(),
            space: env::var("TEXTSCREEN_SPACE").ok(),
        }
    }
}
