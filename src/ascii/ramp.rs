//! Glyph ramp definitions.

use thiserror::Error;
use unicode_width::UnicodeWidthChar;

/// Standard ASCII density ramp (10 levels), sparsest to densest.
pub const STANDARD_RAMP: &str = " .:-=+*#%@";

/// Unicode shade blocks (5 levels).
pub const BLOCKS_RAMP: &str = " ░▒▓█";

/// Minimal ramp (4 levels) for a clean, low-noise look.
pub const MINIMAL_RAMP: &str = " .:#";

/// 11-level ramp used when attaching photos to posts.
pub const DENSE_RAMP: &str = ".,:;+*?%S#@";

const MIN_RAMP_LEN: usize = 2;
const MAX_RAMP_LEN: usize = 64;

/// Errors when building a ramp from configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RampError {
    #[error("glyph ramp needs at least {MIN_RAMP_LEN} glyphs, got {0}")]
    TooShort(usize),
    #[error("glyph ramp allows at most {MAX_RAMP_LEN} glyphs, got {0}")]
    TooLong(usize),
    #[error("glyph ramp repeats '{0}'")]
    Duplicate(char),
    #[error("glyph ramp contains control character {0:?}")]
    ControlChar(char),
    #[error("glyph ramp glyph '{0}' is not one column wide")]
    NotSingleWidth(char),
}

/// An ordered, validated set of glyphs from sparsest to densest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRamp {
    glyphs: Vec<char>,
}

impl Default for GlyphRamp {
    fn default() -> Self {
        Self {
            glyphs: STANDARD_RAMP.chars().collect(),
        }
    }
}

impl GlyphRamp {
    /// Build a ramp from a literal glyph string.
    pub fn new(glyphs: &str) -> Result<Self, RampError> {
        let glyphs: Vec<char> = glyphs.chars().collect();
        if glyphs.len() < MIN_RAMP_LEN {
            return Err(RampError::TooShort(glyphs.len()));
        }
        if glyphs.len() > MAX_RAMP_LEN {
            return Err(RampError::TooLong(glyphs.len()));
        }
        for (i, &c) in glyphs.iter().enumerate() {
            if c.is_control() {
                return Err(RampError::ControlChar(c));
            }
            // Frames map one glyph to one terminal column.
            if c.width() != Some(1) {
                return Err(RampError::NotSingleWidth(c));
            }
            if glyphs[..i].contains(&c) {
                return Err(RampError::Duplicate(c));
            }
        }
        Ok(Self { glyphs })
    }

    /// The dense preset photos are attached with.
    pub fn dense() -> Self {
        Self {
            glyphs: DENSE_RAMP.chars().collect(),
        }
    }

    /// Resolve a preset name (`standard`, `blocks`, `minimal`, `dense`) or
    /// fall back to treating the value as a literal ramp.
    pub fn from_config(value: &str) -> Result<Self, RampError> {
        match value {
            "standard" => Self::new(STANDARD_RAMP),
            "blocks" => Self::new(BLOCKS_RAMP),
            "minimal" => Self::new(MINIMAL_RAMP),
            "dense" => Self::new(DENSE_RAMP),
            literal => Self::new(literal),
        }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false: a validated ramp has at least two glyphs.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Glyph at a bucket index, clamped to the last bucket.
    pub fn glyph(&self, index: usize) -> char {
        self.glyphs[index.min(self.glyphs.len() - 1)]
    }

    /// Sparsest glyph, used for blank areas.
    pub fn sparsest(&self) -> char {
        self.glyphs[0]
    }

    pub fn densest(&self) -> char {
        self.glyphs[self.glyphs.len() - 1]
    }

    pub fn contains(&self, glyph: char) -> bool {
        self.glyphs.contains(&glyph)
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    /// The ramp as a string, for display in settings.
    pub fn as_string(&self) -> String {
        self.glyphs.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ramp_is_standard() {
        let ramp = GlyphRamp::default();
        assert_eq!(ramp.len(), 10);
        assert_eq!(ramp.sparsest(), ' ');
        assert_eq!(ramp.densest(), '@');
    }

    #[test]
    fn test_presets_resolve() {
        assert_eq!(GlyphRamp::from_config("blocks").unwrap().len(), 5);
        assert_eq!(GlyphRamp::from_config("minimal").unwrap().len(), 4);
        assert_eq!(GlyphRamp::from_config("dense").unwrap().len(), 11);
    }

    #[test]
    fn test_wide_and_zero_width_glyphs_rejected() {
        assert_eq!(GlyphRamp::new(" 日"), Err(RampError::NotSingleWidth('日')));
        assert_eq!(GlyphRamp::new(" \u{301}#"), Err(RampError::NotSingleWidth('\u{301}')));
        assert!(GlyphRamp::new(BLOCKS_RAMP).is_ok());
    }

    #[test]
    fn test_dense_preset_matches_config_name() {
        assert_eq!(GlyphRamp::dense(), GlyphRamp::from_config("dense").unwrap());
        assert_eq!(GlyphRamp::dense().sparsest(), '.');
    }

    #[test]
    fn test_literal_ramp() {
        let ramp = GlyphRamp::from_config(" -+#").unwrap();
        assert_eq!(ramp.glyphs(), &[' ', '-', '+', '#']);
    }

    #[test]
    fn test_rejects_short_ramp() {
        assert_eq!(GlyphRamp::new("#"), Err(RampError::TooShort(1)));
        assert_eq!(GlyphRamp::new(""), Err(RampError::TooShort(0)));
    }

    #[test]
    fn test_rejects_duplicates() {
        assert_eq!(GlyphRamp::new(" .:."), Err(RampError::Duplicate('.')));
    }

    #[test]
    fn test_rejects_control_chars() {
        assert_eq!(GlyphRamp::new(" \t#"), Err(RampError::ControlChar('\t')));
    }

    #[test]
    fn test_glyph_index_clamps() {
        let ramp = GlyphRamp::new(" .#").unwrap();
        assert_eq!(ramp.glyph(0), ' ');
        assert_eq!(ramp.glyph(2), '#');
        assert_eq!(ramp.glyph(99), '#');
    }
}
