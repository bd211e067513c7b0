#![forbid(unsafe_code)]

//! Byte-level screen model for presenter validation.
//!
//! A minimal terminal that understands the sequences TextScreen emits, so the
//! visible result of a byte stream can be checked without a real terminal.
//!
//! # Scope
//!
//! This is NOT a terminal emulator. It supports only:
//! - CUP (`CSI row;col H`)
//! - ED (`CSI n J`) and EL (`CSI n K`)
//! - CR, LF, BS
//! - DECTCEM cursor show/hide (`CSI ?25 h/l`)
//! - printable bytes (`0x20..=0x7E`, `0x80..=0xFF`), one cell each
//!
//! LF on the bottom row scrolls the screen up one line. Writing the last
//! column leaves the cursor there with a pending wrap, as VT100-style
//! terminals do: the next printable byte wraps first, while CR, LF and CUP
//! cancel it.
//!
//! ```
//! use textscreen_render::ScreenModel;
//!
//! let mut model = ScreenModel::new(10, 3);
//! model.process(b"\x1b[2;3Hhi\r\n");
//! assert_eq!(model.row_text(1), "  hi");
//! assert_eq!(model.cursor(), (0, 2));
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Ground,
    Escape,
    Csi,
}

#[derive(Debug, Clone)]
pub struct ScreenModel {
    width: usize,
    height: usize,
    cells: Vec<u8>,
    cursor_x: usize,
    cursor_y: usize,
    cursor_visible: bool,
    state: ParseState,
    params: Vec<u32>,
    private: bool,
    wrap_pending: bool,
    scrolled: usize,
}

impl ScreenModel {
    /// A blank `width` x `height` screen, cursor at home.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![b' '; width * height],
            cursor_x: 0,
            cursor_y: 0,
            cursor_visible: true,
            state: ParseState::Ground,
            params: Vec::with_capacity(4),
            private: false,
            wrap_pending: false,
            scrolled: 0,
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Cursor position as `(x, y)`.
    #[must_use]
    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_x, self.cursor_y)
    }

    #[must_use]
    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    #[must_use]
    pub fn cell(&self, x: usize, y: usize) -> Option<u8> {
        (x < self.width && y < self.height).then(|| self.cells[y * self.width + x])
    }

    /// Lines scrolled off the top since creation or [`ScreenModel::reset`].
    #[must_use]
    pub fn scrolled(&self) -> usize {
        self.scrolled
    }

    /// All cells, row-major.
    #[must_use]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    #[must_use]
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        (y < self.height).then(|| &self.cells[y * self.width..(y + 1) * self.width])
    }

    /// Row contents with trailing spaces trimmed. Empty for rows off screen.
    #[must_use]
    pub fn row_text(&self, y: usize) -> String {
        let row = self.row(y).unwrap_or(&[]);
        let end = row.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        String::from_utf8_lossy(&row[..end]).into_owned()
    }

    pub fn reset(&mut self) {
        self.cells.fill(b' ');
        self.cursor_x = 0;
        self.cursor_y = 0;
        self.cursor_visible = true;
        self.state = ParseState::Ground;
        self.params.clear();
        self.private = false;
        self.wrap_pending = false;
        self.scrolled = 0;
    }

    /// Feed output bytes.
    pub fn process(&mut self, bytes: &[u8]) {
        for &b in bytes {
            match self.state {
                ParseState::Ground => self.ground(b),
                ParseState::Escape => self.escape(b),
                ParseState::Csi => self.csi(b),
            }
        }
    }

    fn ground(&mut self, b: u8) {
        match b {
            0x1B => self.state = ParseState::Escape,
            b'\r' => {
                self.wrap_pending = false;
                self.cursor_x = 0;
            }
            b'\n' => {
                self.wrap_pending = false;
                self.line_feed();
            }
            0x08 => {
                self.wrap_pending = false;
                self.cursor_x = self.cursor_x.saturating_sub(1);
            }
            0x00..=0x1F | 0x7F => {}
            _ => self.put(b),
        }
    }

    fn escape(&mut self, b: u8) {
        if b == b'[' {
            self.params.clear();
            self.private = false;
            self.state = ParseState::Csi;
        } else {
            self.state = ParseState::Ground;
        }
    }

    fn csi(&mut self, b: u8) {
        match b {
            b'0'..=b'9' => {
                if self.params.is_empty() {
                    self.params.push(0);
                }
                if let Some(last) = self.params.last_mut() {
                    *last = last.saturating_mul(10).saturating_add(u32::from(b - b'0'));
                }
            }
            b';' => {
                if self.params.is_empty() {
                    self.params.push(0);
                }
                self.params.push(0);
            }
            b'?' => self.private = true,
            0x40..=0x7E => {
                self.execute(b);
                self.state = ParseState::Ground;
            }
            _ => self.state = ParseState::Ground,
        }
    }

    fn param(&self, index: usize, default: u32) -> u32 {
        match self.params.get(index) {
            Some(&0) | None => default,
            Some(&v) => v,
        }
    }

    fn execute(&mut self, final_byte: u8) {
        match final_byte {
            b'H' | b'f' => {
                let row = self.param(0, 1) as usize - 1;
                let col = self.param(1, 1) as usize - 1;
                self.cursor_y = row.min(self.height.saturating_sub(1));
                self.cursor_x = col.min(self.width.saturating_sub(1));
                self.wrap_pending = false;
            }
            b'J' => self.erase_display(self.params.first().copied().unwrap_or(0)),
            b'K' => self.erase_line(self.params.first().copied().unwrap_or(0)),
            b'h' | b'l' if self.private => {
                if self.params.contains(&25) {
                    self.cursor_visible = final_byte == b'h';
                }
            }
            _ => {}
        }
    }

    fn erase_display(&mut self, mode: u32) {
        let at = self.cursor_y * self.width + self.cursor_x.min(self.width);
        match mode {
            0 => {
                let start = at.min(self.cells.len());
                self.cells[start..].fill(b' ');
            }
            1 => {
                let end = (at + 1).min(self.cells.len());
                self.cells[..end].fill(b' ');
            }
            _ => self.cells.fill(b' '),
        }
    }

    fn erase_line(&mut self, mode: u32) {
        if self.cursor_y >= self.height {
            return;
        }
        let start = self.cursor_y * self.width;
        let x = self.cursor_x.min(self.width);
        let width = self.width;
        let row = &mut self.cells[start..start + width];
        match mode {
            0 => row[x..].fill(b' '),
            1 => {
                let end = (x + 1).min(width);
                row[..end].fill(b' ');
            }
            _ => row.fill(b' '),
        }
    }

    fn line_feed(&mut self) {
        if self.cursor_y + 1 < self.height {
            self.cursor_y += 1;
        } else if self.height > 0 {
            self.cells.copy_within(self.width.., 0);
            let last = (self.height - 1) * self.width;
            self.cells[last..].fill(b' ');
            self.scrolled += 1;
        }
    }

    fn put(&mut self, b: u8) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        if self.wrap_pending {
            self.wrap_pending = false;
            self.cursor_x = 0;
            self.line_feed();
        }
        self.cells[self.cursor_y * self.width + self.cursor_x] = b;
        if self.cursor_x + 1 < self.width {
            self.cursor_x += 1;
        } else {
            self.wrap_pending = true;
        }
    }
}
