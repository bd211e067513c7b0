#![forbid(unsafe_code)]

//! Presenter: bitmap to console output.
//!
//! A frame is the visible `width` x `height` window of a bitmap, indented by
//! the left margin and pushed down by the top margin. Showing at offset
//! `(dx, dy)` pans the view: screen cell `(x, y)` samples bitmap cell
//! `(x - dx, y - dy)`. Each sampled byte goes through the translate table
//! before output.
//!
//! # Strategies
//!
//! | [`RenderMethod`] | Output |
//! |------------------|--------|
//! | `Fast` | one write for the whole frame |
//! | `Normal` | one write per row |
//! | `Slow` | one write per byte, thread yield after each row |
//! | `Native` | [`Console::write_rows`] |
//!
//! Every strategy starts by homing the cursor and ends with it at column 0 of
//! the row below the frame, so all four leave the screen in the same state.

use std::io;
use std::thread;

use textscreen_core::bitmap::{Bitmap, SENTINEL};
use textscreen_core::console::Console;
use textscreen_core::settings::{RenderMethod, Settings};

const CRLF: &[u8] = b"\r\n";

/// Geometry of one frame, with margins clamped to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    top: usize,
    left: usize,
    width: usize,
    height: usize,
}

impl Layout {
    fn of(settings: &Settings) -> Self {
        let clamp = |v: i32| usize::try_from(v).unwrap_or(0);
        Self {
            top: clamp(settings.top_margin),
            left: clamp(settings.left_margin),
            width: clamp(settings.width),
            height: clamp(settings.height),
        }
    }

    fn row_len(&self) -> usize {
        self.left + self.width
    }
}

/// Pushes bitmaps to a console. Holds reusable scratch buffers.
#[derive(Debug, Default)]
pub struct Presenter {
    frame: Vec<u8>,
}

impl Presenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `bitmap` panned by `(dx, dy)` using `settings.rendering`.
    ///
    /// When `settings` has no visible area yet, the area is derived from the
    /// live console size minus the margins on both sides.
    pub fn show<C: Console + ?Sized>(
        &mut self,
        console: &mut C,
        bitmap: &Bitmap,
        settings: &Settings,
        dx: i32,
        dy: i32,
    ) -> io::Result<()> {
        let resolved;
        let settings = if settings.has_screen_size() {
            settings
        } else {
            resolved = resolve_from_console(console, settings);
            &resolved
        };
        let layout = Layout::of(settings);

        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "show",
            method = settings.rendering.name(),
            width = layout.width,
            height = layout.height
        )
        .entered();

        self.compose(bitmap, settings, &layout, dx, dy);

        console.set_cursor_pos(0, 0)?;
        match settings.rendering {
            RenderMethod::Fast => self.emit_fast(console, &layout)?,
            RenderMethod::Normal => self.emit_normal(console, &layout)?,
            RenderMethod::Slow => self.emit_slow(console, &layout)?,
            RenderMethod::Native => self.emit_native(console, &layout)?,
        }
        console.flush()
    }

    /// Fill `self.frame` with the translated rows, back to back, no line breaks.
    fn compose(&mut self, bitmap: &Bitmap, settings: &Settings, layout: &Layout, dx: i32, dy: i32) {
        self.frame.clear();
        self.frame.reserve(layout.row_len() * layout.height);
        let table = &settings.translate;
        for y in 0..layout.height as i32 {
            self.frame.resize(self.frame.len() + layout.left, b' ');
            let sy = y.checked_sub(dy);
            for x in 0..layout.width as i32 {
                // A pan that leaves the i32 range samples outside the bitmap.
                let ch = match (x.checked_sub(dx), sy) {
                    (Some(sx), Some(sy)) => bitmap.get(sx, sy),
                    _ => SENTINEL,
                };
                self.frame.push(table.translate(ch));
            }
        }
    }

    fn rows<'a>(&'a self, layout: &Layout) -> impl Iterator<Item = &'a [u8]> + 'a {
        let len = layout.row_len();
        (0..layout.height).map(move |i| &self.frame[i * len..(i + 1) * len])
    }

    fn emit_fast<C: Console + ?Sized>(&self, console: &mut C, layout: &Layout) -> io::Result<()> {
        let mut out = Vec::with_capacity(layout.top * 2 + (layout.row_len() + 2) * layout.height);
        for _ in 0..layout.top {
            out.extend_from_slice(CRLF);
        }
        for row in self.rows(layout) {
            out.extend_from_slice(row);
            out.extend_from_slice(CRLF);
        }
        console.write_bytes(&out)
    }

    fn emit_normal<C: Console + ?Sized>(&self, console: &mut C, layout: &Layout) -> io::Result<()> {
        for _ in 0..layout.top {
            console.write_bytes(CRLF)?;
        }
        let mut line = Vec::with_capacity(layout.row_len() + 2);
        for row in self.rows(layout) {
            line.clear();
            line.extend_from_slice(row);
            line.extend_from_slice(CRLF);
            console.write_bytes(&line)?;
        }
        Ok(())
    }

    fn emit_slow<C: Console + ?Sized>(&self, console: &mut C, layout: &Layout) -> io::Result<()> {
        for _ in 0..layout.top {
            for &b in CRLF {
                console.write_bytes(&[b])?;
            }
        }
        for row in self.rows(layout) {
            for &b in row.iter().chain(CRLF) {
                console.write_bytes(&[b])?;
            }
            thread::yield_now();
        }
        Ok(())
    }

    fn emit_native<C: Console + ?Sized>(&self, console: &mut C, layout: &Layout) -> io::Result<()> {
        let rows: Vec<&[u8]> = self.rows(layout).collect();
        let origin = u16::try_from(layout.top).unwrap_or(u16::MAX);
        console.write_rows(origin, &rows)
    }
}

/// `settings` with the visible area taken from the console.
fn resolve_from_console<C: Console + ?Sized>(console: &C, settings: &Settings) -> Settings {
    let size = console.size();
    let mut resolved = settings.clone();
    resolved.width = i32::from(size.width) - settings.left_margin.max(0) * 2;
    resolved.height = i32::from(size.height) - settings.top_margin.max(0) * 2;
    textscreen_core::debug!(
        width = resolved.width,
        height = resolved.height,
        fallback = size.fallback,
        "screen size resolved from console"
    );
    resolved
}
