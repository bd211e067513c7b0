#![forbid(unsafe_code)]

//! Logging shim.
//!
//! With the `tracing` feature the `tracing` event macros used across the
//! workspace are re-exported here and at the crate root. Without it they
//! expand to nothing:
//!
//! ```
//! textscreen_core::debug!(width = 80, "console size");
//! ```

#[cfg(feature = "tracing")]
pub use tracing::{debug, info, trace, warn};

#[cfg(not(feature = "tracing"))]
mod noop_macros {
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }
}

#[cfg(all(test, not(feature = "tracing")))]
mod tests {
    #[test]
    fn disabled_macros_accept_structured_fields() {
        crate::trace!(len = 3, "escape sequence abandoned");
        crate::debug!(width = 80, height = 25, "screen resized");
        crate::info!("raw mode entered");
        crate::warn!(signal = 2, "termination signal received");
    }
}
