//! Immutable character-grid frames.

use thiserror::Error;

use super::cell::Cell;

/// Errors when assembling a frame from cells.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame of {width}x{height} needs {expected} cells, got {actual}")]
    SizeMismatch {
        width: u16,
        height: u16,
        expected: usize,
        actual: usize,
    },
}

/// A width x height grid of cells in row-major order.
///
/// Frames are produced by media conversion and avatar generation and never
/// change after construction; they are shared between the conversion worker
/// and the UI behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Frame {
    /// Assemble a frame, checking that the cell count matches the size.
    pub fn new(width: u16, height: u16, cells: Vec<Cell>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(FrameError::SizeMismatch {
                width,
                height,
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// A frame with every position set to the same cell.
    pub fn filled(width: u16, height: u16, cell: Cell) -> Self {
        Self {
            width,
            height,
            cells: vec![cell; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell at a column/row, `None` outside the grid.
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(y as usize * self.width as usize + x as usize)
    }

    /// Iterate rows as cell slices.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        // chunks(0) panics; an empty frame has no rows anyway
        self.cells.chunks(self.width.max(1) as usize)
    }

    /// Glyphs only, one line per row joined by newlines.
    pub fn to_string_display(&self) -> String {
        if self.width == 0 || self.height == 0 {
            return String::new();
        }

        self.rows()
            .map(|row| row.iter().map(Cell::glyph).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ascii::Rgb;

    fn cell(c: char) -> Cell {
        Cell::new(c, None)
    }

    #[test]
    fn test_frame_new_checks_size() {
        let err = Frame::new(3, 2, vec![cell('#'); 5]).unwrap_err();
        assert_eq!(
            err,
            FrameError::SizeMismatch {
                width: 3,
                height: 2,
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn test_frame_to_string_display() {
        let cells = "#.:@*+".chars().map(cell).collect();
        let frame = Frame::new(3, 2, cells).unwrap();
        assert_eq!(frame.to_string_display(), "#.:\n@*+");
    }

    #[test]
    fn test_frame_to_string_display_empty() {
        let frame = Frame::new(0, 0, Vec::new()).unwrap();
        assert_eq!(frame.to_string_display(), "");
        assert_eq!(frame.rows().count(), 0);
    }

    #[test]
    fn test_frame_get_bounds() {
        let frame = Frame::filled(2, 2, Cell::new('x', Some(Rgb::new(1, 2, 3))));
        assert_eq!(frame.get(1, 1).map(Cell::glyph), Some('x'));
        assert!(frame.get(2, 0).is_none());
        assert!(frame.get(0, 2).is_none());
    }
}
