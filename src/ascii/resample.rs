//! Area-averaging resampler from RGB pixels to a cell grid.

use super::cell::Rgb;
use super::dimensions::crop_region;
use super::grayscale::luminance;

/// Averaged luminance and color of the pixels under one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub luminance: f32,
    pub color: Rgb,
}

/// Row-major grid of samples, exactly `width x height`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    pub width: u16,
    pub height: u16,
    pub samples: Vec<Sample>,
}

/// Resample packed RGB24 pixels onto a `grid_w x grid_h` grid.
///
/// Each cell averages every pixel it overlaps, weighted by the covered
/// fraction of that pixel, so downscaling by non-integer factors does not
/// drop rows or columns. The source is center-cropped first to compensate
/// for `cell_aspect` (cell height / width).
///
/// Accumulation happens in `f64`, which makes a uniform image come out
/// bit-identical to its pixel value after narrowing back to `f32`.
///
/// Returns an empty grid when either side of the source or target is zero
/// or the pixel buffer is shorter than `src_w * src_h * 3`.
pub fn resample(
    rgb: &[u8],
    src_w: u32,
    src_h: u32,
    grid_w: u16,
    grid_h: u16,
    cell_aspect: f32,
) -> SampleGrid {
    let empty = SampleGrid {
        width: 0,
        height: 0,
        samples: Vec::new(),
    };
    if grid_w == 0 || grid_h == 0 || src_w == 0 || src_h == 0 {
        return empty;
    }
    if rgb.len() < src_w as usize * src_h as usize * 3 {
        return empty;
    }

    let (crop_x, crop_y, crop_w, crop_h) = crop_region(src_w, src_h, grid_w, grid_h, cell_aspect);
    let cell_w = crop_w / grid_w as f64;
    let cell_h = crop_h / grid_h as f64;

    let mut samples = Vec::with_capacity(grid_w as usize * grid_h as usize);

    for cy in 0..grid_h as usize {
        let y0 = crop_y + cy as f64 * cell_h;
        let y1 = y0 + cell_h;
        for cx in 0..grid_w as usize {
            let x0 = crop_x + cx as f64 * cell_w;
            let x1 = x0 + cell_w;
            samples.push(average_area(rgb, src_w, src_h, x0, x1, y0, y1));
        }
    }

    SampleGrid {
        width: grid_w,
        height: grid_h,
        samples,
    }
}

fn average_area(rgb: &[u8], src_w: u32, src_h: u32, x0: f64, x1: f64, y0: f64, y1: f64) -> Sample {
    let px_start = (x0.floor() as u32).min(src_w - 1);
    let px_end = (x1.ceil() as u32).clamp(px_start + 1, src_w);
    let py_start = (y0.floor() as u32).min(src_h - 1);
    let py_end = (y1.ceil() as u32).clamp(py_start + 1, src_h);

    let mut total = 0.0f64;
    let mut lum = 0.0f64;
    let mut r = 0.0f64;
    let mut g = 0.0f64;
    let mut b = 0.0f64;

    for py in py_start..py_end {
        let wy = coverage(py, y0, y1);
        if wy <= 0.0 {
            continue;
        }
        let row = py as usize * src_w as usize * 3;
        for px in px_start..px_end {
            let w = wy * coverage(px, x0, x1);
            if w <= 0.0 {
                continue;
            }
            let idx = row + px as usize * 3;
            let (pr, pg, pb) = (rgb[idx], rgb[idx + 1], rgb[idx + 2]);
            lum += w * luminance(pr, pg, pb) as f64;
            r += w * pr as f64;
            g += w * pg as f64;
            b += w * pb as f64;
            total += w;
        }
    }

    if total <= 0.0 {
        return Sample {
            luminance: 0.0,
            color: Rgb::default(),
        };
    }

    Sample {
        luminance: (lum / total) as f32,
        color: Rgb::new(
            (r / total).round() as u8,
            (g / total).round() as u8,
            (b / total).round() as u8,
        ),
    }
}

/// Fraction of pixel `p` (spanning `p..p+1`) inside `lo..hi`.
#[inline]
fn coverage(p: u32, lo: f64, hi: f64) -> f64 {
    let start = lo.max(p as f64);
    let end = hi.min(p as f64 + 1.0);
    (end - start).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(w: u32, h: u32, v: u8) -> Vec<u8> {
        vec![v; (w * h * 3) as usize]
    }

    #[test]
    fn test_resample_exact_size() {
        let grid = resample(&uniform(64, 48, 10), 64, 48, 13, 7, 2.0);
        assert_eq!(grid.width, 13);
        assert_eq!(grid.height, 7);
        assert_eq!(grid.samples.len(), 13 * 7);
    }

    #[test]
    fn test_resample_uniform_is_exact() {
        let grid = resample(&uniform(37, 23, 200), 37, 23, 11, 5, 2.0);
        for s in &grid.samples {
            assert_eq!(s.luminance, 200.0 / 255.0);
            assert_eq!(s.color, Rgb::new(200, 200, 200));
        }
    }

    #[test]
    fn test_resample_upscale_single_pixel() {
        let grid = resample(&[255, 0, 0], 1, 1, 4, 2, 2.0);
        assert_eq!(grid.samples.len(), 8);
        assert!(grid.samples.iter().all(|s| s.color == Rgb::new(255, 0, 0)));
    }

    #[test]
    fn test_resample_horizontal_gradient_increases() {
        let (w, h) = (64u32, 32u32);
        let mut data = Vec::new();
        for _y in 0..h {
            for x in 0..w {
                let v = (x * 255 / (w - 1)) as u8;
                data.extend_from_slice(&[v, v, v]);
            }
        }
        let grid = resample(&data, w, h, 8, 4, 1.0);
        let first_row: Vec<f32> = grid.samples[..8].iter().map(|s| s.luminance).collect();
        assert!(first_row.windows(2).all(|p| p[0] < p[1]));
    }

    #[test]
    fn test_resample_rejects_short_buffer() {
        let grid = resample(&[0; 5], 2, 2, 2, 2, 2.0);
        assert!(grid.samples.is_empty());
    }

    #[test]
    fn test_resample_zero_target() {
        let grid = resample(&uniform(4, 4, 1), 4, 4, 0, 3, 2.0);
        assert_eq!(grid.width, 0);
        assert!(grid.samples.is_empty());
    }
}
