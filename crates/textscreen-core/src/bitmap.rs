#![forbid(unsafe_code)]

//! Character bitmaps.
//!
//! A [`Bitmap`] is a fixed-size grid of byte cells stored row-major in one
//! contiguous buffer. [`Bitmap::get`], [`Bitmap::put`] and
//! [`Bitmap::clear_cell`] are the only cell primitives; every other operation,
//! drawing included, is built on them and inherits their clipping.
//!
//! # Invariants
//!
//! 1. `cells().len() == width * height`, with both extents in `1..=MAX_EXTENT`.
//! 2. Writes outside `[0, width) x [0, height)` are ignored and reads return 0.
//! 3. Every bitmap gets a process-unique [`BitmapId`]; [`Bitmap::duplicate`]
//!    gets a fresh one, [`Bitmap::crop`] and [`Bitmap::resize`] keep theirs.
//!
//! # Failure modes
//!
//! | Condition | Result |
//! |-----------|--------|
//! | extent < 1 or > `MAX_EXTENT` | [`BitmapError::InvalidGeometry`], nothing changed |
//! | buffer cannot be reserved | [`BitmapError::Allocation`], nothing changed |
//! | out-of-bounds access | clipped |

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::settings::Settings;

/// Largest width or height a bitmap may have.
pub const MAX_EXTENT: i32 = 32768;

/// Corner coordinates accepted unclamped by [`Region::spanning`].
pub const SPAN_LIMIT: i32 = i32::MAX / 2;

/// Value returned by [`Bitmap::get`] outside the grid.
pub const SENTINEL: u8 = 0;

// ── Errors ───────────────────────────────────────────────────────────────

/// Bitmap construction or reshape failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitmapError {
    /// A requested extent is outside `1..=MAX_EXTENT`.
    InvalidGeometry { width: i32, height: i32 },
    /// The cell buffer could not be allocated.
    Allocation { cells: usize },
}

impl fmt::Display for BitmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGeometry { width, height } => write!(
                f,
                "invalid bitmap geometry {width}x{height} (each extent must be 1..={MAX_EXTENT})"
            ),
            Self::Allocation { cells } => write!(f, "failed to allocate {cells} bitmap cells"),
        }
    }
}

impl std::error::Error for BitmapError {}

// ── Identity ─────────────────────────────────────────────────────────────

/// Process-unique bitmap identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitmapId(u64);

impl BitmapId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, AtomicOrdering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A rectangular area in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region whose opposite corners are the two given cells, both included.
    ///
    /// Corners are first clamped to `-SPAN_LIMIT..=SPAN_LIMIT`, far outside
    /// any bitmap, so the extents always fit in an `i32`.
    #[must_use]
    pub fn spanning(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        let clamp = |v: i32| v.clamp(-SPAN_LIMIT, SPAN_LIMIT);
        let (x1, y1, x2, y2) = (clamp(x1), clamp(y1), clamp(x2), clamp(y2));
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: x1.abs_diff(x2) as i32 + 1,
            height: y1.abs_diff(y2) as i32 + 1,
        }
    }
}

// ── Bitmap ───────────────────────────────────────────────────────────────

/// Fixed-size grid of byte cells.
pub struct Bitmap {
    id: BitmapId,
    width: i32,
    height: i32,
    cells: Vec<u8>,
}

fn check_geometry(width: i32, height: i32) -> Result<(), BitmapError> {
    if (1..=MAX_EXTENT).contains(&width) && (1..=MAX_EXTENT).contains(&height) {
        Ok(())
    } else {
        Err(BitmapError::InvalidGeometry { width, height })
    }
}

/// Allocate `width * height` cells set to `fill`. Extents must be validated.
fn alloc_cells(width: i32, height: i32, fill: u8) -> Result<Vec<u8>, BitmapError> {
    let len = width as usize * height as usize;
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(len)
        .map_err(|_| BitmapError::Allocation { cells: len })?;
    cells.resize(len, fill);
    Ok(cells)
}

impl Bitmap {
    /// Create a `width` x `height` bitmap with every cell set to `space`.
    pub fn new(width: i32, height: i32, space: u8) -> Result<Self, BitmapError> {
        check_geometry(width, height)?;
        let cells = alloc_cells(width, height, space)?;
        Ok(Self {
            id: BitmapId::next(),
            width,
            height,
            cells,
        })
    }

    /// Create a bitmap sized against `settings`: a zero extent takes the
    /// settings' visible width or height, and cells start as its space byte.
    pub fn create(width: i32, height: i32, settings: &Settings) -> Result<Self, BitmapError> {
        if !(0..=MAX_EXTENT).contains(&width) || !(0..=MAX_EXTENT).contains(&height) {
            return Err(BitmapError::InvalidGeometry { width, height });
        }
        let width = if width == 0 { settings.width } else { width };
        let height = if height == 0 { settings.height } else { height };
        Self::new(width, height, settings.space)
    }

    #[must_use]
    pub fn id(&self) -> BitmapId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// All cells, row-major.
    #[must_use]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// One row of cells.
    #[must_use]
    pub fn row(&self, y: i32) -> Option<&[u8]> {
        let start = self.index(0, y)?;
        Some(&self.cells[start..start + self.width as usize])
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.index_wide(i64::from(x), i64::from(y))
    }

    /// Like `index`, for coordinates that are sums of two `i32` values.
    #[inline]
    fn index_wide(&self, x: i64, y: i64) -> Option<usize> {
        let (w, h) = (i64::from(self.width), i64::from(self.height));
        if (0..w).contains(&x) && (0..h).contains(&y) {
            Some((y * w + x) as usize)
        } else {
            None
        }
    }

    #[inline]
    fn get_wide(&self, x: i64, y: i64) -> u8 {
        self.index_wide(x, y).map_or(SENTINEL, |i| self.cells[i])
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some()
    }

    /// Cell value, or [`SENTINEL`] outside the grid.
    #[inline]
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        self.index(x, y).map_or(SENTINEL, |i| self.cells[i])
    }

    /// Set a cell. Ignored outside the grid.
    #[inline]
    pub fn put(&mut self, x: i32, y: i32, ch: u8) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = ch;
        }
    }

    /// Reset one cell to `space`.
    #[inline]
    pub fn clear_cell(&mut self, x: i32, y: i32, space: u8) {
        self.put(x, y, space);
    }

    /// Reset every cell to `space`.
    pub fn clear(&mut self, space: u8) {
        self.cells.fill(space);
    }

    /// Deep copy of the cells under a fresh id.
    pub fn duplicate(&self) -> Result<Self, BitmapError> {
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(self.cells.len())
            .map_err(|_| BitmapError::Allocation {
                cells: self.cells.len(),
            })?;
        cells.extend_from_slice(&self.cells);
        Ok(Self {
            id: BitmapId::next(),
            width: self.width,
            height: self.height,
            cells,
        })
    }

    /// Copy all of `src` with its origin at `(dx, dy)`.
    pub fn copy_from(&mut self, src: &Bitmap, dx: i32, dy: i32) {
        self.copy_rect(src, dx, dy, src.bounds(), None);
    }

    /// Copy the cells of `src` that differ from `space`.
    pub fn overlay(&mut self, src: &Bitmap, dx: i32, dy: i32, space: u8) {
        self.copy_rect(src, dx, dy, src.bounds(), Some(space));
    }

    /// Copy `area` of `src` to `(dst_x, dst_y)`.
    ///
    /// With `transparent = Some(space)`, source cells equal to `space` are
    /// skipped. Reads and writes clip independently.
    pub fn copy_rect(
        &mut self,
        src: &Bitmap,
        dst_x: i32,
        dst_y: i32,
        area: Region,
        transparent: Option<u8>,
    ) {
        // Only offsets that land inside `self` can change anything.
        let (dst_x, dst_y) = (i64::from(dst_x), i64::from(dst_y));
        let xs = (-dst_x).max(0)..i64::from(area.width).min(i64::from(self.width) - dst_x);
        let ys = (-dst_y).max(0)..i64::from(area.height).min(i64::from(self.height) - dst_y);
        for y in ys {
            for x in xs.clone() {
                let ch = src.get_wide(i64::from(area.x) + x, i64::from(area.y) + y);
                if transparent == Some(ch) {
                    continue;
                }
                if let Some(i) = self.index_wide(dst_x + x, dst_y + y) {
                    self.cells[i] = ch;
                }
            }
        }
    }

    /// [`Bitmap::copy_rect`] with `self` as the source.
    ///
    /// The source is read from a snapshot taken first, so overlapping
    /// regions behave as if copied from a separate bitmap.
    pub fn copy_rect_within(
        &mut self,
        dst_x: i32,
        dst_y: i32,
        area: Region,
        transparent: Option<u8>,
    ) -> Result<(), BitmapError> {
        let snapshot = self.duplicate()?;
        self.copy_rect(&snapshot, dst_x, dst_y, area, transparent);
        Ok(())
    }

    /// Replace the contents with the `width` x `height` window at `(x, y)`.
    ///
    /// Window cells outside the old grid become `space`.
    pub fn crop(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        space: u8,
    ) -> Result<(), BitmapError> {
        check_geometry(width, height)?;
        let mut cells = alloc_cells(width, height, space)?;
        for yc in 0..height {
            for xc in 0..width {
                let (sx, sy) = (i64::from(x) + i64::from(xc), i64::from(y) + i64::from(yc));
                if let Some(i) = self.index_wide(sx, sy) {
                    cells[yc as usize * width as usize + xc as usize] = self.cells[i];
                }
            }
        }
        self.replace(width, height, cells);
        Ok(())
    }

    /// Nearest-neighbour resample to `width` x `height`.
    pub fn resize(&mut self, width: i32, height: i32) -> Result<(), BitmapError> {
        check_geometry(width, height)?;
        let mut cells = alloc_cells(width, height, SENTINEL)?;
        let (ow, oh) = (i64::from(self.width), i64::from(self.height));
        let (nw, nh) = (i64::from(width), i64::from(height));
        for yc in 0..nh {
            let sy = oh * yc / nh;
            for xc in 0..nw {
                let sx = ow * xc / nw;
                cells[(yc * nw + xc) as usize] = self.cells[(sy * ow + sx) as usize];
            }
        }
        self.replace(width, height, cells);
        Ok(())
    }

    fn replace(&mut self, width: i32, height: i32, cells: Vec<u8>) {
        self.width = width;
        self.height = height;
        self.cells = cells;
    }

    /// Order `src` against this bitmap with `src`'s origin at `(dx, dy)`.
    ///
    /// Cells are compared as unsigned bytes in `src`'s row-major order; the
    /// first difference decides. Cells of `src` that fall outside `self` are
    /// compared against [`SENTINEL`].
    #[must_use]
    pub fn compare(&self, src: &Bitmap, dx: i32, dy: i32) -> Ordering {
        for y in 0..src.height {
            for x in 0..src.width {
                let (tx, ty) = (i64::from(x) + i64::from(dx), i64::from(y) + i64::from(dy));
                let dst = self.get_wide(tx, ty);
                match src.get(x, y).cmp(&dst) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
        }
        Ordering::Equal
    }

    /// The whole grid as a region.
    #[must_use]
    pub fn bounds(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

// ── Attachments ──────────────────────────────────────────────────────────

/// Caller-owned side table associating values with bitmaps by identity.
///
/// Bitmaps know nothing about it: dropping a bitmap leaves its entry in place
/// until removed, and duplicates start without one.
#[derive(Debug, Clone)]
pub struct Attachments<T> {
    entries: HashMap<BitmapId, T>,
}

impl<T> Default for Attachments<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> Attachments<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `value`, returning the previous one.
    pub fn insert(&mut self, id: BitmapId, value: T) -> Option<T> {
        self.entries.insert(id, value)
    }

    #[must_use]
    pub fn get(&self, id: BitmapId) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: BitmapId) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub fn remove(&mut self, id: BitmapId) -> Option<T> {
        self.entries.remove(&id)
    }

    #[must_use]
    pub fn contains(&self, id: BitmapId) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_rows(rows: &[&str]) -> Bitmap {
        let mut b = Bitmap::new(rows[0].len() as i32, rows.len() as i32, b'.').unwrap();
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.bytes().enumerate() {
                b.put(x as i32, y as i32, ch);
            }
        }
        b
    }

    fn rows(b: &Bitmap) -> Vec<String> {
        (0..b.height())
            .map(|y| String::from_utf8(b.row(y).unwrap().to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn new_fills_with_space() {
        let b = Bitmap::new(3, 2, b' ').unwrap();
        assert_eq!(b.cells(), b"      ");
        assert_eq!(b.cells().len(), 6);
    }

    #[test]
    fn geometry_is_validated() {
        assert_eq!(
            Bitmap::new(0, 4, b' ').unwrap_err(),
            BitmapError::InvalidGeometry {
                width: 0,
                height: 4
            }
        );
        assert!(Bitmap::new(MAX_EXTENT + 1, 1, b' ').is_err());
        assert!(Bitmap::new(1, -1, b' ').is_err());
        assert!(Bitmap::new(MAX_EXTENT, 1, b' ').is_ok());
    }

    #[test]
    fn create_resolves_zero_extents_from_settings() {
        let settings = Settings::for_console(40, 12);
        let b = Bitmap::create(0, 0, &settings).unwrap();
        assert_eq!((b.width(), b.height()), (36, 10));
        let b = Bitmap::create(5, 0, &settings).unwrap();
        assert_eq!((b.width(), b.height()), (5, 10));
        assert!(Bitmap::create(-1, 0, &settings).is_err());
        assert!(Bitmap::create(0, MAX_EXTENT + 1, &settings).is_err());
    }

    #[test]
    fn create_fails_when_settings_have_no_size() {
        let mut settings = Settings::default();
        settings.width = 0;
        assert!(matches!(
            Bitmap::create(0, 3, &settings),
            Err(BitmapError::InvalidGeometry { width: 0, .. })
        ));
    }

    #[test]
    fn out_of_bounds_access_clips() {
        let mut b = Bitmap::new(2, 2, b' ').unwrap();
        b.put(-1, 0, b'x');
        b.put(2, 0, b'x');
        b.put(0, 2, b'x');
        assert_eq!(b.cells(), b"    ");
        assert_eq!(b.get(5, 5), SENTINEL);
        assert_eq!(b.get(-1, -1), SENTINEL);
        assert!(b.row(2).is_none());
    }

    #[test]
    fn ids_are_unique() {
        let a = Bitmap::new(1, 1, b' ').unwrap();
        let b = a.duplicate().unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn duplicate_is_independent() {
        let a = from_rows(&["ab", "cd"]);
        let mut b = a.duplicate().unwrap();
        b.put(0, 0, b'z');
        assert_eq!(rows(&a), ["ab", "cd"]);
        assert_eq!(rows(&b), ["zb", "cd"]);
    }

    #[test]
    fn copy_and_overlay() {
        let mut dst = from_rows(&["....", "...."]);
        let src = from_rows(&["a.", ".b"]);
        dst.overlay(&src, 1, 0, b'.');
        assert_eq!(rows(&dst), [".a..", "..b."]);

        let mut dst = from_rows(&["xxxx", "xxxx"]);
        dst.copy_from(&src, 3, 1);
        assert_eq!(rows(&dst), ["xxxx", "xxxa"]);
    }

    #[test]
    fn copy_rect_sub_area() {
        let src = from_rows(&["abc", "def", "ghi"]);
        let mut dst = from_rows(&["....", "...."]);
        dst.copy_rect(&src, 0, 0, Region::new(1, 1, 2, 2), None);
        assert_eq!(rows(&dst), ["ef..", "hi.."]);
    }

    #[test]
    fn copy_rect_within_reads_snapshot() {
        let mut b = from_rows(&["abcd"]);
        b.copy_rect_within(1, 0, Region::new(0, 0, 3, 1), None)
            .unwrap();
        assert_eq!(rows(&b), ["aabc"]);
    }

    #[test]
    fn crop_clears_outside_window() {
        let mut b = from_rows(&["abc", "def"]);
        let id = b.id();
        b.crop(1, 1, 3, 2, b' ').unwrap();
        assert_eq!(rows(&b), ["ef ", "   "]);
        assert_eq!(b.id(), id);
        assert!(b.crop(0, 0, 0, 1, b' ').is_err());
        assert_eq!((b.width(), b.height()), (3, 2));
    }

    #[test]
    fn resize_nearest_neighbour() {
        let mut b = from_rows(&["ab", "cd"]);
        b.resize(4, 2).unwrap();
        assert_eq!(rows(&b), ["aabb", "ccdd"]);
        b.resize(2, 1).unwrap();
        assert_eq!(rows(&b), ["ab"]);
    }

    #[test]
    fn compare_orders_source_against_destination() {
        let dst = from_rows(&["abc"]);
        assert_eq!(dst.compare(&from_rows(&["abc"]), 0, 0), Ordering::Equal);
        assert_eq!(dst.compare(&from_rows(&["abd"]), 0, 0), Ordering::Greater);
        assert_eq!(dst.compare(&from_rows(&["b"]), 1, 0), Ordering::Equal);
        assert_eq!(dst.compare(&from_rows(&["A"]), 0, 0), Ordering::Less);
        // Anything beats the sentinel outside the destination.
        assert_eq!(dst.compare(&from_rows(&["c"]), 3, 0), Ordering::Greater);
    }

    #[test]
    fn compare_is_unsigned() {
        let mut hi = Bitmap::new(1, 1, 0xF0).unwrap();
        let lo = Bitmap::new(1, 1, 0x10).unwrap();
        assert_eq!(lo.compare(&hi, 0, 0), Ordering::Greater);
        hi.put(0, 0, 0x10);
        assert_eq!(lo.compare(&hi, 0, 0), Ordering::Equal);
    }

    #[test]
    fn spanning_clamps_far_corners() {
        assert_eq!(Region::spanning(3, 1, 1, 2), Region::new(1, 1, 3, 2));
        assert_eq!(
            Region::spanning(i32::MIN, i32::MAX, i32::MAX, i32::MIN),
            Region::new(-SPAN_LIMIT, -SPAN_LIMIT, i32::MAX, i32::MAX)
        );
    }

    #[test]
    fn offsets_at_the_coordinate_limits_clip() {
        let src = from_rows(&["ab", "cd"]);
        let mut dst = from_rows(&["...", "..."]);
        dst.copy_from(&src, i32::MAX, i32::MAX);
        dst.overlay(&src, i32::MIN, 0, b' ');
        let far = Region::new(i32::MAX, i32::MIN, i32::MAX, i32::MAX);
        dst.copy_rect(&src, 0, 0, far, Some(SENTINEL));
        assert_eq!(rows(&dst), ["...", "..."]);

        dst.copy_rect(&src, -1, -1, Region::new(0, 0, i32::MAX, i32::MAX), None);
        assert_eq!(dst.get(0, 0), b'd');
        assert_eq!(dst.get(1, 0), SENTINEL);

        assert_eq!(src.compare(&src, i32::MAX, i32::MIN), Ordering::Greater);
        let mut b = from_rows(&["ab"]);
        b.crop(i32::MAX, i32::MIN, 2, 1, b' ').unwrap();
        assert_eq!(rows(&b), ["  "]);
    }

    #[test]
    fn attachments_are_keyed_by_identity() {
        let a = Bitmap::new(1, 1, b' ').unwrap();
        let dup = a.duplicate().unwrap();
        let mut notes = Attachments::new();
        assert!(notes.insert(a.id(), "sprite").is_none());
        assert_eq!(notes.get(a.id()), Some(&"sprite"));
        assert!(!notes.contains(dup.id()));
        *notes.get_mut(a.id()).unwrap() = "tile";
        assert_eq!(notes.remove(a.id()), Some("tile"));
        assert!(notes.is_empty());
    }
}
