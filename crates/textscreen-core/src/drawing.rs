#![forbid(unsafe_code)]

//! Drawing primitives for bitmaps.
//!
//! Every primitive ends in [`Bitmap::put`], so nothing outside the grid is
//! written. Loops are clipped to the grid before they start, which keeps the
//! cost of a shape proportional to the part of it the bitmap can show.
//!
//! Circles are corrected for non-square cells: with a sample aspect ratio
//! `sar`, horizontal distances are stretched by `sar` so a radius-`r` circle
//! spans `2·r·sar + 1` columns and `2·r + 1` rows.

use std::fmt;
use std::ops::{Range, RangeInclusive};

use crate::bitmap::{Bitmap, MAX_EXTENT, Region};
use crate::settings::{DEFAULT_SAR, DEFAULT_SPACE, Settings, clamp_sar};

/// Largest accepted circle radius.
pub const MAX_RADIUS: i32 = MAX_EXTENT;

/// Invalid drawing geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawError {
    /// Circle radius must be in `1..=MAX_RADIUS`.
    InvalidRadius(i32),
}

impl fmt::Display for DrawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRadius(r) => write!(f, "invalid circle radius {r}"),
        }
    }
}

impl std::error::Error for DrawError {}

/// How a closed shape is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillMode {
    /// Border only.
    #[default]
    Outline,
    /// Border and interior in the drawing character.
    Filled,
    /// Border, with the interior reset to the space byte.
    Cleared,
}

impl FillMode {
    /// Numeric mode: 1 = filled, 2 = cleared, anything else = outline.
    #[must_use]
    pub const fn from_index(mode: i32) -> Self {
        match mode {
            1 => Self::Filled,
            2 => Self::Cleared,
            _ => Self::Outline,
        }
    }
}

/// The parts of [`Settings`] that shape drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub space: u8,
    sar: f64,
}

impl Brush {
    #[must_use]
    pub fn new(space: u8, sar: f64) -> Self {
        Self {
            space,
            sar: clamp_sar(sar),
        }
    }

    #[must_use]
    pub fn sar(&self) -> f64 {
        self.sar
    }
}

impl Default for Brush {
    fn default() -> Self {
        Self::new(DEFAULT_SPACE, DEFAULT_SAR)
    }
}

impl From<&Settings> for Brush {
    fn from(settings: &Settings) -> Self {
        Self::new(settings.space, settings.sar())
    }
}

/// Extension trait for drawing on a [`Bitmap`].
pub trait Draw {
    /// Straight line between two cells, both endpoints included.
    fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, ch: u8);

    fn draw_rect(&mut self, area: Region, ch: u8, mode: FillMode, brush: &Brush);

    fn draw_fill_rect(&mut self, area: Region, ch: u8);

    /// [`Draw::draw_rect`] over the rectangle spanned by two corner cells.
    fn draw_rect_between(
        &mut self,
        from: (i32, i32),
        to: (i32, i32),
        ch: u8,
        mode: FillMode,
        brush: &Brush,
    ) {
        let area = Region::spanning(from.0, from.1, to.0, to.1);
        self.draw_rect(area, ch, mode, brush);
    }

    fn draw_fill_rect_between(&mut self, from: (i32, i32), to: (i32, i32), ch: u8) {
        self.draw_fill_rect(Region::spanning(from.0, from.1, to.0, to.1), ch);
    }

    /// Circle of radius `r` centred on `(x, y)`. Fails without drawing when
    /// `r` is outside `1..=MAX_RADIUS`.
    fn draw_circle(
        &mut self,
        x: i32,
        y: i32,
        r: i32,
        ch: u8,
        mode: FillMode,
        brush: &Brush,
    ) -> Result<(), DrawError>;

    fn draw_fill_circle(
        &mut self,
        x: i32,
        y: i32,
        r: i32,
        ch: u8,
        brush: &Brush,
    ) -> Result<(), DrawError> {
        self.draw_circle(x, y, r, ch, FillMode::Filled, brush)
    }

    /// Bytes of `text` left to right from `(x, y)`. No wrapping.
    fn draw_text(&mut self, x: i32, y: i32, text: &[u8]);
}

impl Draw for Bitmap {
    fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, ch: u8) {
        line(
            self,
            i64::from(x1),
            i64::from(y1),
            i64::from(x2),
            i64::from(y2),
            ch,
        );
    }

    fn draw_rect(&mut self, area: Region, ch: u8, mode: FillMode, brush: &Brush) {
        let (x, y, w, h) = wide(area);
        match mode {
            FillMode::Filled => return fill_area(self, x, y, w, h, ch),
            FillMode::Cleared => fill_area(self, x + 1, y + 1, w - 2, h - 2, brush.space),
            FillMode::Outline => {}
        }
        for xc in span(x, x + w, self.width()) {
            put_at(self, xc, y, ch);
            put_at(self, xc, y + h - 1, ch);
        }
        for yc in span(y, y + h, self.height()) {
            put_at(self, x, yc, ch);
            put_at(self, x + w - 1, yc, ch);
        }
    }

    fn draw_fill_rect(&mut self, area: Region, ch: u8) {
        let (x, y, w, h) = wide(area);
        fill_area(self, x, y, w, h, ch);
    }

    fn draw_circle(
        &mut self,
        x: i32,
        y: i32,
        r: i32,
        ch: u8,
        mode: FillMode,
        brush: &Brush,
    ) -> Result<(), DrawError> {
        if !(1..=MAX_RADIUS).contains(&r) {
            return Err(DrawError::InvalidRadius(r));
        }
        let sar = brush.sar();
        let (x, y) = (i64::from(x), i64::from(y));
        let reach_x = reach(x, self.width());
        let reach_y = reach(y, self.height());
        let columns = || ColumnSweep::new(r, sar).take_while(move |&(xd, _)| xd <= reach_x);
        let rows = || RowSweep::new(r, sar).take_while(move |&(_, yd)| yd <= reach_y);

        if mode == FillMode::Cleared {
            fill_circle(self, x, y, columns(), rows(), brush.space);
        }
        if mode == FillMode::Filled {
            fill_circle(self, x, y, columns(), rows(), ch);
            return Ok(());
        }
        for (xd, yd) in columns().chain(rows()) {
            put_at(self, x + xd, y + yd, ch);
            put_at(self, x + xd, y - yd, ch);
            put_at(self, x - xd, y + yd, ch);
            put_at(self, x - xd, y - yd, ch);
        }
        Ok(())
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &[u8]) {
        for (i, &ch) in text.iter().enumerate() {
            let Ok(i) = i32::try_from(i) else { break };
            self.put(x.saturating_add(i), y, ch);
        }
    }
}

// Geometry below runs in i64 so no sum of two i32 coordinates can overflow.
// Every loop is clipped to the bitmap before it starts.

fn wide(area: Region) -> (i64, i64, i64, i64) {
    (
        i64::from(area.x),
        i64::from(area.y),
        i64::from(area.width),
        i64::from(area.height),
    )
}

#[inline]
fn put_at(bitmap: &mut Bitmap, x: i64, y: i64, ch: u8) {
    if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
        bitmap.put(x, y, ch);
    }
}

/// The part of `start..end` inside `0..extent`.
#[inline]
fn span(start: i64, end: i64, extent: i32) -> Range<i64> {
    start.max(0)..end.min(i64::from(extent))
}

/// Steps `t` in `0..=steps` for which `start + dir * t` lies in `0..extent`.
fn clip_steps(start: i64, dir: i64, steps: i64, extent: i32) -> RangeInclusive<i64> {
    let last = i64::from(extent) - 1;
    let (lo, hi) = if dir > 0 {
        (-start, last - start)
    } else {
        (start - last, start)
    };
    lo.max(0)..=hi.min(steps)
}

/// Largest distance from `c` to any index in `0..extent`.
#[inline]
fn reach(c: i64, extent: i32) -> i64 {
    c.abs().max((c - (i64::from(extent) - 1)).abs())
}

fn fill_area(bitmap: &mut Bitmap, x: i64, y: i64, w: i64, h: i64, ch: u8) {
    let columns = span(x, x + w, bitmap.width());
    for yc in span(y, y + h, bitmap.height()) {
        for xc in columns.clone() {
            put_at(bitmap, xc, yc, ch);
        }
    }
}

fn line(bitmap: &mut Bitmap, x1: i64, y1: i64, x2: i64, y2: i64, ch: u8) {
    let (dx, dy) = (x2 - x1, y2 - y1);
    let (sx, sy) = (step(dx), step(dy));
    let (adx, ady) = (dx.abs(), dy.abs());
    if adx >= ady {
        for t in clip_steps(x1, sx, adx, bitmap.width()) {
            let off = minor_offset(ady, adx, t);
            put_at(bitmap, x1 + sx * t, y1 + sy * off, ch);
        }
    } else {
        for t in clip_steps(y1, sy, ady, bitmap.height()) {
            let off = minor_offset(adx, ady, t);
            put_at(bitmap, x1 + sx * off, y1 + sy * t, ch);
        }
    }
}

#[inline]
fn step(d: i64) -> i64 {
    if d < 0 { -1 } else { 1 }
}

/// Rounded minor-axis offset at step `t` along the major axis.
#[inline]
fn minor_offset(minor: i64, major: i64, t: i64) -> i64 {
    if major == 0 {
        return 0;
    }
    let scaled = i128::from(minor) * i128::from(t) * 256 / i128::from(major);
    // At most `minor`, which fits.
    ((scaled + 128) / 256) as i64
}

/// Offsets `(xd, yd)` found by stepping the column offset from 0 to `r·sar`.
///
/// Stops once the row offset falls by more than one cell between columns.
struct ColumnSweep {
    r2: f64,
    sar: f64,
    limit: f64,
    xd: i32,
    last: i32,
    done: bool,
}

impl ColumnSweep {
    fn new(r: i32, sar: f64) -> Self {
        Self {
            r2: f64::from(r) * f64::from(r),
            sar,
            limit: f64::from(r) * sar,
            xd: 0,
            last: r,
            done: false,
        }
    }
}

impl Iterator for ColumnSweep {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || f64::from(self.xd) > self.limit {
            return None;
        }
        let xd = f64::from(self.xd);
        let m = self.r2 - xd * xd / (self.sar * self.sar);
        let yd = (m.abs().sqrt() + 0.5) as i32;
        if self.last - yd > 1 {
            self.done = true;
            return None;
        }
        self.last = yd;
        let point = (i64::from(self.xd), i64::from(yd));
        self.xd += 1;
        Some(point)
    }
}

/// Offsets `(xd, yd)` found by stepping the row offset from 0 to `r`.
///
/// Stops once the column offset falls by more than one cell between rows.
struct RowSweep {
    r: i32,
    sar: f64,
    yd: i32,
    last: i32,
    done: bool,
}

impl RowSweep {
    fn new(r: i32, sar: f64) -> Self {
        Self {
            r,
            sar,
            yd: 0,
            last: r,
            done: false,
        }
    }
}

impl Iterator for RowSweep {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.yd > self.r {
            return None;
        }
        let (r, yd) = (f64::from(self.r), f64::from(self.yd));
        let xd = ((r * r - yd * yd).sqrt() * self.sar + 0.5) as i32;
        if self.last - xd > 1 {
            self.done = true;
            return None;
        }
        self.last = xd;
        let point = (i64::from(xd), i64::from(self.yd));
        self.yd += 1;
        Some(point)
    }
}

fn fill_circle(
    bitmap: &mut Bitmap,
    x: i64,
    y: i64,
    columns: impl Iterator<Item = (i64, i64)>,
    rows: impl Iterator<Item = (i64, i64)>,
    ch: u8,
) {
    for (xd, yd) in columns {
        fill_area(bitmap, x + xd, y - yd, 1, 2 * yd + 1, ch);
        fill_area(bitmap, x - xd, y - yd, 1, 2 * yd + 1, ch);
    }
    for (xd, yd) in rows {
        fill_area(bitmap, x - xd, y + yd, 2 * xd + 1, 1, ch);
        fill_area(bitmap, x - xd, y - yd, 2 * xd + 1, 1, ch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(w: i32, h: i32) -> Bitmap {
        Bitmap::new(w, h, b'.').unwrap()
    }

    fn rows(b: &Bitmap) -> Vec<String> {
        (0..b.height())
            .map(|y| String::from_utf8(b.row(y).unwrap().to_vec()).unwrap())
            .collect()
    }

    fn brush(sar: f64) -> Brush {
        Brush::new(b'.', sar)
    }

    // --- Lines ---

    #[test]
    fn horizontal_line_sets_exactly_its_cells() {
        let mut b = blank(8, 2);
        b.draw_line(0, 0, 5, 0, b'#');
        assert_eq!(rows(&b), ["######..", "........"]);
    }

    #[test]
    fn reversed_vertical_line() {
        let mut b = blank(2, 4);
        b.draw_line(1, 3, 1, 1, b'|');
        assert_eq!(rows(&b), ["..", ".|", ".|", ".|"]);
    }

    #[test]
    fn shallow_line_rounds_minor_axis() {
        let mut b = blank(8, 4);
        b.draw_line(0, 0, 7, 3, b'#');
        assert_eq!(rows(&b), ["##......", "..##....", "....##..", "......##"]);
    }

    #[test]
    fn steep_line_runs_backwards() {
        let mut b = blank(8, 8);
        b.draw_line(6, 7, 1, 0, b'#');
        assert_eq!(
            rows(&b),
            [
                ".#......",
                "..#.....",
                "..#.....",
                "...#....",
                "....#...",
                ".....#..",
                ".....#..",
                "......#.",
            ]
        );
    }

    #[test]
    fn line_endpoints_are_plotted_and_clipped() {
        let mut b = blank(3, 3);
        b.draw_line(-2, 1, 4, 1, b'-');
        assert_eq!(rows(&b), ["...", "---", "..."]);
        b.draw_line(2, 2, 2, 2, b'o');
        assert_eq!(b.get(2, 2), b'o');
    }

    // --- Rectangles ---

    #[test]
    fn fill_rect_touches_only_its_cells() {
        let mut b = blank(5, 4);
        b.draw_fill_rect(Region::new(0, 0, 3, 2), b'X');
        assert_eq!(rows(&b), ["XXX..", "XXX..", ".....", "....."]);
    }

    #[test]
    fn rect_outline_and_cleared() {
        let mut b = Bitmap::new(5, 4, b'z').unwrap();
        b.draw_rect(Region::new(0, 0, 5, 4), b'#', FillMode::Outline, &brush(2.0));
        assert_eq!(rows(&b), ["#####", "#zzz#", "#zzz#", "#####"]);
        b.draw_rect(Region::new(0, 0, 5, 4), b'+', FillMode::Cleared, &brush(2.0));
        assert_eq!(rows(&b), ["+++++", "+...+", "+...+", "+++++"]);
    }

    #[test]
    fn rect_between_normalizes_corners() {
        let mut a = blank(6, 5);
        let mut b = blank(6, 5);
        a.draw_rect_between((4, 3), (1, 1), b'o', FillMode::Outline, &brush(2.0));
        b.draw_rect(Region::new(1, 1, 4, 3), b'o', FillMode::Outline, &brush(2.0));
        assert_eq!(rows(&a), rows(&b));
        a.draw_fill_rect_between((5, 0), (5, 0), b'!');
        assert_eq!(a.get(5, 0), b'!');
    }

    #[test]
    fn fill_rect_clips_negative_origin() {
        let mut b = blank(3, 3);
        b.draw_fill_rect(Region::new(-5, -5, 7, 7), b'#');
        assert_eq!(rows(&b), ["##.", "##.", "..."]);
    }

    // --- Circles ---

    #[test]
    fn filled_circle_square_cells() {
        let mut b = blank(10, 10);
        b.draw_fill_circle(5, 5, 4, b'*', &brush(1.0)).unwrap();
        assert_eq!(
            rows(&b),
            [
                "..........",
                "....***...",
                "..*******.",
                "..*******.",
                ".*********",
                ".*********",
                ".*********",
                "..*******.",
                "..*******.",
                "....***...",
            ]
        );
    }

    #[test]
    fn outline_circle_square_cells() {
        let mut b = blank(10, 10);
        b.draw_circle(5, 5, 4, b'*', FillMode::Outline, &brush(1.0))
            .unwrap();
        assert_eq!(
            rows(&b),
            [
                "..........",
                "....***...",
                "..**...**.",
                "..*.....*.",
                ".*.......*",
                ".*.......*",
                ".*.......*",
                "..*.....*.",
                "..**...**.",
                "....***...",
            ]
        );
    }

    #[test]
    fn filled_circle_is_stretched_by_sar() {
        let mut b = blank(20, 9);
        b.draw_fill_circle(8, 4, 4, b'*', &brush(2.0)).unwrap();
        assert_eq!(
            rows(&b),
            [
                ".....*******........",
                "..*************.....",
                ".***************....",
                "*****************...",
                "*****************...",
                "*****************...",
                ".***************....",
                "..*************.....",
                ".....*******........",
            ]
        );
    }

    #[test]
    fn smallest_circle() {
        let mut b = blank(7, 7);
        b.draw_circle(3, 3, 1, b'*', FillMode::Outline, &brush(1.0))
            .unwrap();
        assert_eq!(
            rows(&b),
            [".......", ".......", "...*...", "..*.*..", "...*...", ".......", "......."]
        );
    }

    #[test]
    fn cleared_circle_blanks_interior() {
        let mut b = Bitmap::new(10, 10, b'#').unwrap();
        b.draw_circle(5, 5, 4, b'*', FillMode::Cleared, &brush(1.0))
            .unwrap();
        assert_eq!(b.get(5, 5), b'.');
        assert_eq!(b.get(5, 1), b'*');
        assert_eq!(b.get(0, 0), b'#');
    }

    #[test]
    fn non_positive_radius_is_rejected_without_drawing() {
        let mut b = blank(4, 4);
        assert_eq!(
            b.draw_fill_circle(2, 2, 0, b'*', &brush(2.0)),
            Err(DrawError::InvalidRadius(0))
        );
        assert_eq!(
            b.draw_circle(2, 2, -3, b'*', FillMode::Outline, &brush(2.0)),
            Err(DrawError::InvalidRadius(-3))
        );
        assert!(b.cells().iter().all(|&c| c == b'.'));
    }

    #[test]
    fn radius_beyond_the_maximum_is_rejected() {
        let mut b = blank(4, 4);
        assert_eq!(
            b.draw_circle(2, 2, MAX_RADIUS + 1, b'*', FillMode::Filled, &brush(2.0)),
            Err(DrawError::InvalidRadius(MAX_RADIUS + 1))
        );
        assert!(b.cells().iter().all(|&c| c == b'.'));
    }

    #[test]
    fn huge_circle_only_visits_what_the_bitmap_shows() {
        // Centre far off to the left; the arc passes through column 1.
        let mut b = blank(4, 3);
        b.draw_circle(-MAX_RADIUS + 1, 1, MAX_RADIUS, b'*', FillMode::Outline, &brush(1.0))
            .unwrap();
        assert_eq!(rows(&b), [".*..", ".*..", ".*.."]);
        let mut b = blank(4, 3);
        b.draw_fill_circle(1, 1, MAX_RADIUS, b'*', &brush(10.0)).unwrap();
        assert!(b.cells().iter().all(|&c| c == b'*'));
    }

    #[test]
    fn circle_centres_at_the_coordinate_limits() {
        let mut b = blank(4, 4);
        for (x, y) in [(i32::MAX, i32::MAX), (i32::MIN, i32::MIN), (i32::MIN, i32::MAX)] {
            b.draw_circle(x, y, 3, b'*', FillMode::Cleared, &brush(10.0))
                .unwrap();
        }
        assert!(b.cells().iter().all(|&c| c == b'.'));
    }

    // --- Coordinate limits ---

    #[test]
    fn lines_across_the_whole_coordinate_range() {
        let mut b = blank(4, 3);
        b.draw_line(i32::MIN, 0, 3, 0, b'-');
        b.draw_line(1, i32::MAX, 1, i32::MIN, b'|');
        assert_eq!(rows(&b), ["-|--", ".|..", ".|.."]);
        let mut b = blank(4, 3);
        b.draw_line(i32::MIN, i32::MIN, i32::MAX, i32::MAX, b'\\');
        b.draw_line(i32::MAX, i32::MIN, i32::MIN, i32::MAX, b'/');
        assert_eq!(b.cells().len(), 12);
    }

    #[test]
    fn rects_reaching_past_i32_max() {
        let mut b = blank(3, 2);
        b.draw_fill_rect(Region::new(i32::MAX - 1, 0, 5, 1), b'#');
        b.draw_rect(Region::new(i32::MAX, i32::MAX, i32::MAX, 2), b'#', FillMode::Cleared, &brush(1.0));
        b.draw_rect(Region::new(i32::MIN, i32::MIN, 2, 2), b'#', FillMode::Outline, &brush(1.0));
        assert_eq!(rows(&b), ["...", "..."]);
        b.draw_fill_rect(Region::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX), b'#');
        assert_eq!(rows(&b), ["...", "..."]);
        b.draw_fill_rect(Region::spanning(i32::MIN, i32::MIN, i32::MAX, i32::MAX), b'#');
        assert_eq!(rows(&b), ["###", "###"]);
    }

    #[test]
    fn outline_of_a_huge_rect_clips_to_its_edges() {
        let mut b = blank(3, 3);
        b.draw_rect(Region::new(1, -1, i32::MAX, i32::MAX), b'#', FillMode::Outline, &brush(1.0));
        assert_eq!(rows(&b), [".#.", ".#.", ".#."]);
    }

    // --- Text ---

    #[test]
    fn text_is_clipped_not_wrapped() {
        let mut b = blank(5, 2);
        b.draw_text(3, 0, b"hello");
        b.draw_text(-2, 1, b"world");
        assert_eq!(rows(&b), ["...he", "rld.."]);
    }

    #[test]
    fn fill_mode_from_index() {
        assert_eq!(FillMode::from_index(0), FillMode::Outline);
        assert_eq!(FillMode::from_index(1), FillMode::Filled);
        assert_eq!(FillMode::from_index(2), FillMode::Cleared);
        assert_eq!(FillMode::from_index(7), FillMode::Outline);
    }
}
