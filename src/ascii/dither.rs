//! Floyd-Steinberg error diffusion on luminance.

use super::cell::Cell;
use super::mapper::GlyphMapper;
use super::resample::SampleGrid;

/// Map a sample grid to cells, diffusing each cell's quantization error to
/// its unvisited neighbours before they are quantized.
///
/// Smooth gradients and near-uniform regions come out as a mix of adjacent
/// glyphs instead of hard bands. Colors are passed through untouched.
///
/// ```text
///        [*] 7/16
///  3/16 5/16 1/16
/// ```
pub fn dither_floyd_steinberg(grid: &SampleGrid, mapper: &GlyphMapper) -> Vec<Cell> {
    let w = grid.width as usize;
    let h = grid.height as usize;
    let mut work: Vec<f32> = grid.samples.iter().map(|s| s.luminance).collect();
    let mut cells = Vec::with_capacity(w * h);

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let wanted = work[idx];
            let sample = &grid.samples[idx];

            let index = mapper.index(wanted);
            cells.push(mapper.map(wanted, Some(sample.color)));

            let error = wanted - mapper.bucket_luminance(index);
            if error == 0.0 || !error.is_finite() {
                continue;
            }

            if x + 1 < w {
                work[idx + 1] += error * 7.0 / 16.0;
            }
            if y + 1 < h {
                if x > 0 {
                    work[idx + w - 1] += error * 3.0 / 16.0;
                }
                work[idx + w] += error * 5.0 / 16.0;
                if x + 1 < w {
                    work[idx + w + 1] += error / 16.0;
                }
            }
        }
    }

    cells
}
