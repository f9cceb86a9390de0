//! Applies render writes to a terminal through crossterm.

use std::io;

use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor::MoveTo, queue};

use crate::ascii::{ColorMode, Rgb};

use super::diff::Write;
use super::grid::Style;

/// The 16 ANSI colors as xterm draws them.
const ANSI16: [(Color, Rgb); 16] = [
    (Color::Black, Rgb::new(0, 0, 0)),
    (Color::DarkRed, Rgb::new(205, 0, 0)),
    (Color::DarkGreen, Rgb::new(0, 205, 0)),
    (Color::DarkYellow, Rgb::new(205, 205, 0)),
    (Color::DarkBlue, Rgb::new(0, 0, 238)),
    (Color::DarkMagenta, Rgb::new(205, 0, 205)),
    (Color::DarkCyan, Rgb::new(0, 205, 205)),
    (Color::Grey, Rgb::new(229, 229, 229)),
    (Color::DarkGrey, Rgb::new(127, 127, 127)),
    (Color::Red, Rgb::new(255, 0, 0)),
    (Color::Green, Rgb::new(0, 255, 0)),
    (Color::Yellow, Rgb::new(255, 255, 0)),
    (Color::Blue, Rgb::new(92, 92, 255)),
    (Color::Magenta, Rgb::new(255, 0, 255)),
    (Color::Cyan, Rgb::new(0, 255, 255)),
    (Color::White, Rgb::new(255, 255, 255)),
];

/// Nearest ANSI color by squared RGB distance.
pub fn nearest_ansi16(rgb: Rgb) -> Color {
    let dist = |c: Rgb| {
        let dr = i32::from(rgb.r) - i32::from(c.r);
        let dg = i32::from(rgb.g) - i32::from(c.g);
        let db = i32::from(rgb.b) - i32::from(c.b);
        dr * dr + dg * dg + db * db
    };
    ANSI16
        .iter()
        .min_by_key(|(_, c)| dist(*c))
        .map(|(color, _)| *color)
        .unwrap_or(Color::Reset)
}

/// Terminal color for a cell color under a color mode.
pub fn terminal_color(rgb: Rgb, mode: ColorMode) -> Option<Color> {
    match mode {
        ColorMode::Mono => None,
        ColorMode::Ansi16 => Some(nearest_ansi16(rgb)),
        ColorMode::Truecolor => Some(Color::Rgb {
            r: rgb.r,
            g: rgb.g,
            b: rgb.b,
        }),
    }
}

/// Queue `writes` on `out` and flush once.
pub fn apply<W: io::Write>(out: &mut W, writes: &[Write], mode: ColorMode) -> io::Result<()> {
    if writes.is_empty() {
        return Ok(());
    }
    for write in writes {
        match write {
            Write::Clear => {
                queue!(out, ResetColor, SetAttribute(Attribute::Reset), Clear(ClearType::All))?;
            }
            Write::Run { x, y, style, text } => {
                queue!(out, MoveTo(*x, *y))?;
                set_style(out, *style, mode)?;
                queue!(out, Print(text))?;
                queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
            }
        }
    }
    out.flush()
}

fn set_style<W: io::Write>(out: &mut W, style: Style, mode: ColorMode) -> io::Result<()> {
    if let Some(color) = style.fg.and_then(|fg| terminal_color(fg, mode)) {
        queue!(out, SetForegroundColor(color))?;
    }
    if style.bold {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    if style.dim {
        queue!(out, SetAttribute(Attribute::Dim))?;
    }
    if style.reverse {
        queue!(out, SetAttribute(Attribute::Reverse))?;
    }
    Ok(())
}
