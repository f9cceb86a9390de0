//! Errors that end the program.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::media::ConversionError;

/// Anything that reaches `main`. The terminal is restored before these are
/// printed.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("terminal unavailable: {0}")]
    Terminal(#[source] io::Error),

    #[error("cannot read terminal dimensions: {0}")]
    Dimensions(#[source] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot start async runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("cannot install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("cannot write output: {0}")]
    Output(#[source] io::Error),
}

impl FatalError {
    /// Process exit status. Configuration problems are usage errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::Config(_) => 2,
            FatalError::Conversion(_) | FatalError::Playback(_) => 3,
            _ => 1,
        }
    }
}
