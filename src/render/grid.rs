//! Flat row-major cell arena the UI is composited into.
//!
//! Columns are terminal columns. A double-width glyph occupies its own cell
//! plus a [`CONTINUATION`] cell to its right, which renderers skip.

use ratatui::layout::Rect;
use unicode_width::UnicodeWidthChar;

use crate::ascii::{Frame, Rgb};

/// Visual attributes of one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Style {
    pub fg: Option<Rgb>,
    pub bold: bool,
    pub reverse: bool,
    pub dim: bool,
}

impl Style {
    pub const PLAIN: Style = Style {
        fg: None,
        bold: false,
        reverse: false,
        dim: false,
    };

    pub const fn fg(color: Rgb) -> Self {
        Style {
            fg: Some(color),
            bold: false,
            reverse: false,
            dim: false,
        }
    }

    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub const fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub const fn dim(mut self) -> Self {
        self.dim = true;
        self
    }
}

/// Placeholder stored in the column covered by the right half of a wide
/// glyph.
pub const CONTINUATION: char = '\0';

/// Terminal columns `ch` takes up once written to a grid. Control
/// characters are blanked to one space; zero-width marks are dropped.
pub fn display_width(ch: char) -> u16 {
    if ch.is_control() {
        return 1;
    }
    ch.width().unwrap_or(0).min(2) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyledCell {
    pub ch: char,
    pub style: Style,
}

impl StyledCell {
    pub const BLANK: StyledCell = StyledCell {
        ch: ' ',
        style: Style::PLAIN,
    };

    pub fn is_continuation(&self) -> bool {
        self.ch == CONTINUATION
    }
}

impl Default for StyledCell {
    fn default() -> Self {
        Self::BLANK
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: u16,
    height: u16,
    cells: Vec<StyledCell>,
}

impl Grid {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![StyledCell::BLANK; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn area(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn cells(&self) -> &[StyledCell] {
        &self.cells
    }

    /// Resize and blank every cell, reusing the allocation.
    pub fn reset(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells
            .resize(width as usize * height as usize, StyledCell::BLANK);
    }

    pub fn clear(&mut self) {
        self.cells.fill(StyledCell::BLANK);
    }

    pub fn row(&self, y: u16) -> &[StyledCell] {
        let w = self.width as usize;
        let start = y as usize * w;
        self.cells.get(start..start + w).unwrap_or(&[])
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&StyledCell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(y as usize * self.width as usize + x as usize)
    }

    /// Set one glyph and return the columns it took: 2 for a wide glyph,
    /// 0 for a zero-width mark or an out-of-bounds position. A wide glyph
    /// with no room for its right half becomes a space.
    pub fn set(&mut self, x: u16, y: u16, ch: char, style: Style) -> u16 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        let (ch, width) = match display_width(ch) {
            0 => return 0,
            _ if ch.is_control() => (' ', 1),
            2 if x + 1 >= self.width => (' ', 1),
            w => (ch, w),
        };
        self.split_wide(x, y);
        let idx = self.index(x, y);
        self.cells[idx] = StyledCell { ch, style };
        if width == 2 {
            self.split_wide(x + 1, y);
            self.cells[idx + 1] = StyledCell {
                ch: CONTINUATION,
                style,
            };
        }
        width
    }

    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Blank the other half of any wide glyph covering `(x, y)`, so that
    /// overwriting one half never leaves the other dangling.
    fn split_wide(&mut self, x: u16, y: u16) {
        let idx = self.index(x, y);
        if self.cells[idx].is_continuation() && x > 0 {
            self.cells[idx - 1].ch = ' ';
            self.cells[idx].ch = ' ';
        }
        if x + 1 < self.width && self.cells[idx + 1].is_continuation() {
            self.cells[idx + 1].ch = ' ';
        }
    }

    /// Write `text` from `(x, y)`, clipped to `max_width` columns and to the
    /// grid. A wide glyph that would straddle the edge is left out. Returns
    /// the number of columns written.
    pub fn put_str(&mut self, x: u16, y: u16, text: &str, style: Style, max_width: u16) -> u16 {
        let limit = max_width.min(self.width.saturating_sub(x));
        let mut written: u16 = 0;
        for ch in text.chars() {
            let w = display_width(ch);
            if w == 0 {
                continue;
            }
            if written + w > limit {
                break;
            }
            written += self.set(x + written, y, ch, style);
        }
        written
    }

    /// Write `text` into a rect's row, clipped to the rect.
    pub fn put_line(&mut self, area: Rect, row: u16, text: &str, style: Style) -> u16 {
        if row >= area.height {
            return 0;
        }
        self.put_str(area.x, area.y + row, text, style, area.width)
    }

    /// Fill a rect with one character.
    pub fn fill(&mut self, area: Rect, ch: char, style: Style) {
        for y in area.y..area.y.saturating_add(area.height) {
            for x in area.x..area.x.saturating_add(area.width) {
                self.set(x, y, ch, style);
            }
        }
    }

    /// Restyle every cell of a rect, keeping characters.
    pub fn restyle(&mut self, area: Rect, style: Style) {
        let x_end = area.x.saturating_add(area.width).min(self.width);
        for y in area.y..area.y.saturating_add(area.height).min(self.height) {
            for x in area.x.min(x_end)..x_end {
                let idx = self.index(x, y);
                self.cells[idx].style = style;
            }
        }
    }

    /// Copy a frame's cells with their colors, top-left at `(x, y)`,
    /// clipped to `clip`.
    pub fn blit_frame(&mut self, frame: &Frame, x: u16, y: u16, clip: Rect) {
        for (row, cells) in frame.rows().enumerate() {
            let ty = y as usize + row;
            if ty >= (clip.y + clip.height) as usize || ty < clip.y as usize {
                continue;
            }
            for (col, cell) in cells.iter().enumerate() {
                let tx = x as usize + col;
                if tx >= (clip.x + clip.width) as usize || tx < clip.x as usize {
                    continue;
                }
                let style = cell.color().map(Style::fg).unwrap_or(Style::PLAIN);
                self.set(tx as u16, ty as u16, cell.glyph(), style);
            }
        }
    }

    /// Row text, for tests and headless output.
    pub fn row_text(&self, y: u16) -> String {
        self.row(y)
            .iter()
            .filter(|c| !c.is_continuation())
            .map(|c| c.ch)
            .collect()
    }
}
