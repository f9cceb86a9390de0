//! Aspect-ratio arithmetic for terminal cells.

/// Terminal cells are roughly twice as tall as they are wide.
pub const DEFAULT_CELL_ASPECT_RATIO: f32 = 2.0;

/// Largest grid that fits `max_w x max_h` and shows an image of
/// `src_w x src_h` pixels undistorted.
///
/// `cell_aspect` is the cell height divided by its width. A square image
/// needs `cell_aspect` times fewer rows than columns.
///
/// Returns `(0, 0)` when any input dimension is zero.
pub fn fit_grid(src_w: u32, src_h: u32, max_w: u16, max_h: u16, cell_aspect: f32) -> (u16, u16) {
    if src_w == 0 || src_h == 0 || max_w == 0 || max_h == 0 {
        return (0, 0);
    }
    let cell_aspect = sanitize_aspect(cell_aspect);

    // columns per row that keeps the picture undistorted
    let target = src_w as f32 / src_h as f32 * cell_aspect;

    let height = (max_w as f32 / target).round() as u16;
    if height > 0 && height <= max_h {
        return (max_w, height);
    }

    let width = (max_h as f32 * target).round() as u16;
    (width.clamp(1, max_w), max_h)
}

/// Source rectangle `(x, y, w, h)` in pixels, as floats, that a grid of
/// `grid_w x grid_h` cells should sample so the picture is not stretched.
///
/// The source is center-cropped to the grid's displayed aspect ratio, so
/// every cell always covers real pixels.
pub(crate) fn crop_region(
    src_w: u32,
    src_h: u32,
    grid_w: u16,
    grid_h: u16,
    cell_aspect: f32,
) -> (f64, f64, f64, f64) {
    let src_w = src_w as f64;
    let src_h = src_h as f64;
    let displayed = grid_w as f64 / (grid_h as f64 * sanitize_aspect(cell_aspect) as f64);
    let source = src_w / src_h;

    if source > displayed {
        // too wide: trim left and right
        let w = src_h * displayed;
        ((src_w - w) / 2.0, 0.0, w, src_h)
    } else {
        let h = src_w / displayed;
        (0.0, (src_h - h) / 2.0, src_w, h)
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        DEFAULT_CELL_ASPECT_RATIO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_grid_square_image() {
        // 1:1 image at 2:1 cells: twice as many columns as rows
        assert_eq!(fit_grid(100, 100, 40, 40, 2.0), (40, 20));
    }

    #[test]
    fn test_fit_grid_height_constrained() {
        // 4:3 image wants 80x30, only 10 rows available
        let (w, h) = fit_grid(640, 480, 80, 10, 2.0);
        assert_eq!(h, 10);
        assert_eq!(w, 27);
    }

    #[test]
    fn test_fit_grid_zero_inputs() {
        assert_eq!(fit_grid(0, 100, 40, 20, 2.0), (0, 0));
        assert_eq!(fit_grid(100, 100, 0, 20, 2.0), (0, 0));
    }

    #[test]
    fn test_fit_grid_bad_aspect_uses_default() {
        assert_eq!(fit_grid(100, 100, 40, 40, -1.0), fit_grid(100, 100, 40, 40, 2.0));
    }

    #[test]
    fn test_crop_region_wide_source() {
        // 200x100 source into a grid displaying 1:1 (20 cols x 10 rows at 2.0)
        let (x, y, w, h) = crop_region(200, 100, 20, 10, 2.0);
        assert_eq!((x, y, w, h), (50.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_crop_region_tall_source() {
        let (x, y, w, h) = crop_region(100, 200, 20, 10, 2.0);
        assert_eq!((x, y, w, h), (0.0, 50.0, 100.0, 100.0));
    }
}
