#![forbid(unsafe_code)]

//! TextScreen public facade crate.
//!
//! Character bitmaps drawn in memory and pushed to a raw terminal, with
//! non-blocking key polling. [`TextScreen`] owns the console and everything
//! that used to be process-global: settings, the key decoder, the presenter
//! and the interrupt bridge.
//!
//! ```no_run
//! use textscreen::prelude::*;
//!
//! fn main() -> textscreen::Result<()> {
//!     let mut screen = TextScreen::open_tty(None)?;
//!     let mut bitmap = screen.create_bitmap(0, 0)?;
//!     let brush = screen.brush();
//!     bitmap.draw_circle(20, 10, 8, b'o', FillMode::Outline, &brush)?;
//!     loop {
//!         screen.show_bitmap(&bitmap, 0, 0)?;
//!         if screen.get_key() == KeyCode::ESCAPE {
//!             break;
//!         }
//!         screen.wait(16);
//!     }
//!     screen.end()
//! }
//! ```

use std::fmt;

mod screen;

pub use screen::{InterruptHandler, TextScreen};

// --- Core re-exports -------------------------------------------------------

pub use textscreen_core::bitmap::{Attachments, Bitmap, BitmapError, BitmapId, Region};
pub use textscreen_core::console::{Console, ConsoleSize, InputEncoding, MemoryConsole};
pub use textscreen_core::drawing::{Brush, Draw, DrawError, FillMode};
pub use textscreen_core::key::{KeyCode, Modifiers};
pub use textscreen_core::settings::{EnvOverrides, RenderMethod, Settings, TranslateTable};

// --- Render / backend re-exports ------------------------------------------

pub use textscreen_render::Presenter;
pub use textscreen_tty::{INTERRUPT_SIGNAL, NativeConsole, TtyConsole};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for TextScreen.
#[derive(Debug)]
pub enum Error {
    /// I/O failure during console operations.
    Io(std::io::Error),
    /// Bitmap could not be created or reshaped.
    Bitmap(BitmapError),
    /// Drawing primitive rejected its geometry.
    Draw(DrawError),
    /// Screen dimensions out of range.
    InvalidSize { width: i32, height: i32 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Bitmap(err) => write!(f, "{err}"),
            Self::Draw(err) => write!(f, "{err}"),
            Self::InvalidSize { width, height } => {
                write!(f, "invalid screen size {width}x{height}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Bitmap(err) => Some(err),
            Self::Draw(err) => Some(err),
            Self::InvalidSize { .. } => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<BitmapError> for Error {
    fn from(err: BitmapError) -> Self {
        Self::Bitmap(err)
    }
}

impl From<DrawError> for Error {
    fn from(err: DrawError) -> Self {
        Self::Draw(err)
    }
}

/// Standard result type for TextScreen APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Bitmap, Brush, Console, ConsoleSize, Draw, Error, FillMode, KeyCode, Modifiers, Region,
        RenderMethod, Result, Settings, TextScreen,
    };
}
