//! Double-buffered diff renderer.
//!
//! Each call composites the view into the back grid, compares it with the
//! front grid (what the terminal currently shows), emits the differences,
//! then swaps the two. A change of dimensions throws the front grid away and
//! redraws everything after a clear.

use super::grid::{Grid, Style};

/// Terminal size in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dims {
    pub width: u16,
    pub height: u16,
}

impl Dims {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One terminal write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    /// Clear the whole screen.
    Clear,
    /// Move to `(x, y)` and print `text` in `style`.
    Run { x: u16, y: u16, style: Style, text: String },
}

/// Anything that can paint itself into a grid.
pub trait View {
    fn draw(&self, grid: &mut Grid);
}

#[derive(Debug)]
pub struct RenderPipeline {
    front: Grid,
    back: Grid,
    dims: Option<Dims>,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self {
            front: Grid::new(0, 0),
            back: Grid::new(0, 0),
            dims: None,
        }
    }

    /// Dimensions of the last render, if any.
    pub fn dims(&self) -> Option<Dims> {
        self.dims
    }

    /// What the terminal shows after the last render.
    pub fn front(&self) -> &Grid {
        &self.front
    }

    /// Forget what is on screen; the next render redraws everything.
    pub fn invalidate(&mut self) {
        self.dims = None;
    }

    pub fn render<V: View + ?Sized>(&mut self, view: &V, dims: Dims) -> Vec<Write> {
        if dims.is_empty() {
            self.dims = Some(dims);
            self.front.reset(0, 0);
            return Vec::new();
        }

        let full = self.dims != Some(dims);
        self.back.reset(dims.width, dims.height);
        view.draw(&mut self.back);

        let mut writes = Vec::new();
        if full {
            log::debug!("full redraw at {}x{}", dims.width, dims.height);
            writes.push(Write::Clear);
            for y in 0..dims.height {
                push_runs(&mut writes, &self.back, None, y);
            }
        } else {
            for y in 0..dims.height {
                push_runs(&mut writes, &self.back, Some(&self.front), y);
            }
        }

        std::mem::swap(&mut self.front, &mut self.back);
        self.dims = Some(dims);
        writes
    }
}

/// Append coalesced runs for one row. With no previous grid every cell
/// counts as changed.
///
/// Continuation cells are never written: printing a wide glyph already
/// covers them, so they neither extend nor break a run. A wide glyph counts
/// as changed when either of its halves did.
fn push_runs(writes: &mut Vec<Write>, next: &Grid, prev: Option<&Grid>, y: u16) {
    let row = next.row(y);
    let old = prev.map(|p| p.row(y));
    let differs = |x: usize| match old {
        Some(old) => old.get(x) != row.get(x),
        None => true,
    };
    let mut run: Option<(u16, Style, String)> = None;

    for (x, cell) in row.iter().enumerate() {
        if cell.is_continuation() {
            continue;
        }
        let tail = row.get(x + 1).is_some_and(|c| c.is_continuation());
        let changed = differs(x) || (tail && differs(x + 1));
        if !changed {
            if let Some((rx, style, text)) = run.take() {
                writes.push(Write::Run { x: rx, y, style, text });
            }
            continue;
        }
        match run.as_mut() {
            Some((_, style, text)) if *style == cell.style => text.push(cell.ch),
            _ => {
                if let Some((rx, style, text)) = run.take() {
                    writes.push(Write::Run { x: rx, y, style, text });
                }
                run = Some((x as u16, cell.style, cell.ch.to_string()));
            }
        }
    }
    if let Some((rx, style, text)) = run {
        writes.push(Write::Run { x: rx, y, style, text });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Text(Vec<(u16, u16, &'static str)>);

    impl View for Text {
        fn draw(&self, grid: &mut Grid) {
            for (x, y, s) in &self.0 {
                grid.put_str(*x, *y, s, Style::PLAIN, u16::MAX);
            }
        }
    }

    fn runs(writes: &[Write]) -> Vec<(u16, u16, String)> {
        writes
            .iter()
            .filter_map(|w| match w {
                Write::Run { x, y, text, .. } => Some((*x, *y, text.clone())),
                Write::Clear => None,
            })
            .collect()
    }

    #[test]
    fn test_first_render_is_full() {
        let mut p = RenderPipeline::new();
        let writes = p.render(&Text(vec![(0, 0, "hi")]), Dims::new(4, 2));
        assert_eq!(writes[0], Write::Clear);
        assert_eq!(
            runs(&writes),
            vec![(0, 0, "hi  ".to_string()), (0, 1, "    ".to_string())]
        );
    }

    #[test]
    fn test_unchanged_state_writes_nothing() {
        let mut p = RenderPipeline::new();
        let view = Text(vec![(1, 1, "abc")]);
        p.render(&view, Dims::new(8, 3));
        assert!(p.render(&view, Dims::new(8, 3)).is_empty());
        assert!(p.render(&view, Dims::new(8, 3)).is_empty());
    }

    #[test]
    fn test_changes_are_coalesced_per_row() {
        let mut p = RenderPipeline::new();
        p.render(&Text(vec![(0, 0, "aaaaaa")]), Dims::new(6, 2));
        let writes = p.render(&Text(vec![(0, 0, "abbaba"), (2, 1, "x")]), Dims::new(6, 2));
        assert_eq!(
            runs(&writes),
            vec![
                (1, 0, "bb".to_string()),
                (4, 0, "b".to_string()),
                (2, 1, "x".to_string()),
            ]
        );
        assert!(!writes.contains(&Write::Clear));
    }

    #[test]
    fn test_style_change_splits_run() {
        struct Styled;
        impl View for Styled {
            fn draw(&self, grid: &mut Grid) {
                grid.put_str(0, 0, "ab", Style::PLAIN, 2);
                grid.put_str(2, 0, "cd", Style::PLAIN.bold(), 2);
            }
        }
        let mut p = RenderPipeline::new();
        let writes = p.render(&Styled, Dims::new(4, 1));
        assert_eq!(runs(&writes), vec![(0, 0, "ab".into()), (2, 0, "cd".into())]);
    }

    #[test]
    fn test_resize_forces_full_redraw() {
        let mut p = RenderPipeline::new();
        let view = Text(vec![(0, 0, "x")]);
        p.render(&view, Dims::new(3, 1));
        let writes = p.render(&view, Dims::new(2, 2));
        assert_eq!(writes[0], Write::Clear);
        assert_eq!(runs(&writes).len(), 2);
        assert!(p.render(&view, Dims::new(2, 2)).is_empty());
    }

    #[test]
    fn test_invalidate_forces_full_redraw() {
        let mut p = RenderPipeline::new();
        let view = Text(vec![]);
        p.render(&view, Dims::new(2, 1));
        p.invalidate();
        assert_eq!(p.render(&view, Dims::new(2, 1))[0], Write::Clear);
    }

    #[test]
    fn test_zero_dims_write_nothing() {
        let mut p = RenderPipeline::new();
        assert!(p.render(&Text(vec![(0, 0, "x")]), Dims::new(0, 10)).is_empty());
        // Growing back from zero is a dims change.
        assert_eq!(p.render(&Text(vec![]), Dims::new(1, 1))[0], Write::Clear);
    }

    // ==== Wide glyphs ====

    #[test]
    fn test_full_render_skips_continuation_cells() {
        let mut p = RenderPipeline::new();
        let writes = p.render(&Text(vec![(0, 0, "日本x")]), Dims::new(6, 1));
        assert_eq!(runs(&writes), vec![(0, 0, "日本x ".to_string())]);
    }

    #[test]
    fn test_change_after_wide_glyphs_lands_on_its_column() {
        let mut p = RenderPipeline::new();
        p.render(&Text(vec![(0, 0, "日本x")]), Dims::new(6, 1));
        let writes = p.render(&Text(vec![(0, 0, "日本y")]), Dims::new(6, 1));
        assert_eq!(runs(&writes), vec![(4, 0, "y".to_string())]);
    }

    #[test]
    fn test_narrow_to_wide_rewrites_both_columns() {
        let mut p = RenderPipeline::new();
        p.render(&Text(vec![(0, 0, "abc")]), Dims::new(3, 1));
        let writes = p.render(&Text(vec![(0, 0, "日c")]), Dims::new(3, 1));
        assert_eq!(runs(&writes), vec![(0, 0, "日".to_string())]);

        let writes = p.render(&Text(vec![(0, 0, "abc")]), Dims::new(3, 1));
        assert_eq!(runs(&writes), vec![(0, 0, "ab".to_string())]);
    }

    #[test]
    fn test_front_tracks_last_render() {
        let mut p = RenderPipeline::new();
        p.render(&Text(vec![(0, 0, "ok")]), Dims::new(2, 1));
        assert_eq!(p.front().row_text(0), "ok");
    }
}
