//! RGB to luminance using the ITU-R BT.601 weights.

/// Luminance of an RGB pixel in `0.0..=1.0`.
///
/// Y = 0.299*R + 0.587*G + 0.114*B, computed with integer math (weights
/// scaled by 1000) so that gray pixels map back to exactly `v / 255`.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    let y = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
    y as f32 / 255.0
}
