#![forbid(unsafe_code)]

//! Core: character bitmaps, drawing, settings, console contract and key decoding.

pub mod bitmap;
pub mod console;
pub mod drawing;
pub mod key;
pub mod key_decoder;
pub mod key_table;
pub mod logging;
pub mod settings;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, info, trace, warn};
