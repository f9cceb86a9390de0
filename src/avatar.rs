//! Seed-based ASCII avatars.
//!
//! A small lattice of seeded random values is interpolated into a
//! symmetric blob, tinted, and handed to the same resample and glyph stage
//! that converts photos, so avatars look like converted media.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::ascii::Frame;
use crate::media::{render_pixels, ConvertOptions, PixelBuffer};

/// Lattice points per side before interpolation.
const LATTICE: usize = 5;

/// Source pixels per cell column; rows follow from the cell aspect.
const PIXELS_PER_CELL: f32 = 4.0;

/// Generate an avatar with the default ramp and no color.
pub fn generate(seed: u64, width: u16, height: u16) -> Frame {
    generate_with(seed, &ConvertOptions::new(width, height))
}

/// Generate an avatar using the grid size, ramp, and color mode in `opts`.
pub fn generate_with(seed: u64, opts: &ConvertOptions) -> Frame {
    let pixels = pattern(seed, opts.width, opts.height, opts.cell_aspect);
    render_pixels(&pixels, opts)
        .unwrap_or_else(|_| Frame::filled(opts.width, opts.height, opts.mapper.blank()))
}

/// Seed derived from a user handle, ignoring case and surrounding spaces.
pub fn seed_for_handle(handle: &str) -> u64 {
    let normalized = handle.trim().trim_start_matches('@').to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Render the procedural pattern for `seed` as an RGB picture sized so
/// that it fills a `width x height` cell grid without cropping.
pub(crate) fn pattern(seed: u64, width: u16, height: u16, cell_aspect: f32) -> PixelBuffer {
    let aspect = if cell_aspect.is_finite() && cell_aspect > 0.0 {
        cell_aspect
    } else {
        1.0
    };
    let pw = ((width as f32 * PIXELS_PER_CELL).round() as u32).max(1);
    let ph = ((height as f32 * PIXELS_PER_CELL * aspect).round() as u32).max(1);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut lattice = [[0.0f32; LATTICE]; LATTICE];
    for row in lattice.iter_mut() {
        for v in row.iter_mut() {
            *v = rng.gen::<f32>();
        }
    }
    let tint = hue_to_rgb(rng.gen::<f32>());
    let brightness = 0.6 + 0.4 * rng.gen::<f32>();

    let mut data = Vec::with_capacity(pw as usize * ph as usize * 3);
    for y in 0..ph {
        let v = unit(y, ph);
        for x in 0..pw {
            // mirror around the vertical axis
            let mx = x.min(pw - 1 - x);
            let mu = (2.0 * unit(mx, pw)).min(1.0);
            let noise = bilinear(&lattice, mu, v);

            let dx = 1.0 - mu;
            let dy = 2.0 * v - 1.0;
            let falloff = (1.0 - (dx * dx + dy * dy)).clamp(0.0, 1.0);

            let value = (noise * falloff * brightness * 1.6).clamp(0.0, 1.0);
            for c in tint {
                data.push((c * value * 255.0).round() as u8);
            }
        }
    }

    PixelBuffer::from_rgb(pw, ph, data).unwrap_or_else(|_| PixelBuffer::gray(pw, ph, 0))
}

/// Position of pixel `i` of `n` in `0.0..=1.0`.
fn unit(i: u32, n: u32) -> f32 {
    if n <= 1 {
        0.5
    } else {
        i as f32 / (n - 1) as f32
    }
}

fn bilinear(lattice: &[[f32; LATTICE]; LATTICE], u: f32, v: f32) -> f32 {
    let max = (LATTICE - 1) as f32;
    let fx = u.clamp(0.0, 1.0) * max;
    let fy = v.clamp(0.0, 1.0) * max;
    let x0 = (fx.floor() as usize).min(LATTICE - 1);
    let y0 = (fy.floor() as usize).min(LATTICE - 1);
    let x1 = (x0 + 1).min(LATTICE - 1);
    let y1 = (y0 + 1).min(LATTICE - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let top = lattice[y0][x0] * (1.0 - tx) + lattice[y0][x1] * tx;
    let bottom = lattice[y1][x0] * (1.0 - tx) + lattice[y1][x1] * tx;
    top * (1.0 - ty) + bottom * ty
}

/// Fully saturated color for a hue in `0.0..1.0`, lifted towards white so
/// no channel goes fully dark.
fn hue_to_rgb(hue: f32) -> [f32; 3] {
    let h = (hue.fract() * 6.0).max(0.0);
    let sector = h.floor() as u32;
    let f = h - sector as f32;
    let (r, g, b) = match sector {
        0 => (1.0, f, 0.0),
        1 => (1.0 - f, 1.0, 0.0),
        2 => (0.0, 1.0, f),
        3 => (0.0, 1.0 - f, 1.0),
        4 => (f, 0.0, 1.0),
        _ => (1.0, 0.0, 1.0 - f),
    };
    let lift = |c: f32| 0.45 + 0.55 * c;
    [lift(r), lift(g), lift(b)]
}
