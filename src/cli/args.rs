//! CLI argument parsing with clap.

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use crate::ascii::ColorMode;

/// Parse a color mode name (mono, ansi16, truecolor).
pub fn parse_color(s: &str) -> Result<ColorMode, String> {
    ColorMode::from_name(s)
        .ok_or_else(|| format!("Unknown color mode '{}'. Use mono, ansi16 or truecolor", s))
}

/// Parse a grid side (1-1000 cells).
pub fn parse_cells(s: &str) -> Result<u16, String> {
    let n: u16 = s.parse().map_err(|_| format!("'{}' is not a valid cell count", s))?;
    if !(1..=1000).contains(&n) {
        return Err(format!("Cell count must be between 1 and 1000, got {}", n));
    }
    Ok(n)
}

/// Terminal client for the tuitter social network
#[derive(Parser, Debug)]
#[command(name = "tuitter")]
#[command(version, about = "Terminal client for the tuitter social network", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Browse generated sample content without signing in
    #[arg(long)]
    pub demo: bool,

    /// Picture or clip attached to the first sample post (with --demo)
    #[arg(long, requires = "demo")]
    pub demo_media: Option<PathBuf>,

    /// Log file (default: platform state directory)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a picture or clip and print it as text
    Play {
        /// Image, GIF or video file
        path: PathBuf,

        /// Grid width in cells (default: terminal width)
        #[arg(long, value_parser = parse_cells)]
        width: Option<u16>,

        /// Grid height in cells (default: terminal height)
        #[arg(long, value_parser = parse_cells)]
        height: Option<u16>,

        /// Color mode (default: from config)
        #[arg(long, value_parser = parse_color)]
        color: Option<ColorMode>,

        /// Floyd-Steinberg dithering
        #[arg(long)]
        dither: bool,

        /// Glyph ramp preset or literal (default: from config)
        #[arg(long)]
        ramp: Option<String>,
    },
    /// Print the generated avatar for a seed or handle
    #[command(group(ArgGroup::new("who").required(true).args(["seed", "handle"])))]
    Avatar {
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        handle: Option<String>,

        #[arg(long, default_value = "16", value_parser = parse_cells)]
        width: u16,

        #[arg(long, default_value = "8", value_parser = parse_cells)]
        height: u16,

        /// Color mode (default: from config)
        #[arg(long, value_parser = parse_color)]
        color: Option<ColorMode>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}
