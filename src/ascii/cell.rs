//! Cell and color types for character-grid frames.

use serde::Deserialize;
use std::fmt;

/// 24-bit RGB color attached to a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// How much color information frames carry to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Glyphs only, no color.
    #[default]
    Mono,
    /// Colors quantized to the 16 ANSI palette entries at output time.
    Ansi16,
    /// 24-bit color.
    Truecolor,
}

impl ColorMode {
    /// Whether cells produced in this mode carry a color.
    pub fn is_color(&self) -> bool {
        !matches!(self, ColorMode::Mono)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColorMode::Mono => "mono",
            ColorMode::Ansi16 => "ansi16",
            ColorMode::Truecolor => "truecolor",
        }
    }

    /// Parse a mode name as used in config files and on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mono" | "monochrome" => Some(ColorMode::Mono),
            "ansi16" | "ansi" => Some(ColorMode::Ansi16),
            "truecolor" | "24bit" => Some(ColorMode::Truecolor),
            _ => None,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One grid position: a ramp glyph and an optional color.
///
/// Cells are only built by [`GlyphMapper`](super::GlyphMapper), which draws
/// the glyph from its ramp, so a cell is never partially specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    glyph: char,
    color: Option<Rgb>,
}

impl Cell {
    pub(crate) const fn new(glyph: char, color: Option<Rgb>) -> Self {
        Self { glyph, color }
    }

    pub fn glyph(&self) -> char {
        self.glyph
    }

    pub fn color(&self) -> Option<Rgb> {
        self.color
    }
}
