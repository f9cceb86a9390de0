//! Command-line interface definitions and helpers.
//!
//! This module contains argument parsing and the subcommand handlers.

mod args;
mod commands;

pub use args::{parse_cells, parse_color, Args, Command, ConfigAction};
pub use commands::{
    avatar, handle_config_action, init_config, init_logging, play, print_frame, run_tui, PlayOptions,
};

use crate::config::Config;
use crate::error::FatalError;

/// Load the configuration, start logging and run the chosen command.
pub fn run(args: Args) -> Result<(), FatalError> {
    let config_path = args.config.as_deref();

    // `config init` must work even when the existing file is broken
    if let Some(Command::Config {
        action: ConfigAction::Init,
    }) = &args.command
    {
        return handle_config_action(&Config::default(), config_path, ConfigAction::Init);
    }

    let config = Config::load(config_path)?;
    let log_path = init_logging(&config, args.log_file.as_deref())?;
    log::debug!("logging to {}", log_path.display());

    match args.command {
        None => run_tui(&config, args.demo, args.demo_media),
        Some(Command::Play {
            path,
            width,
            height,
            color,
            dither,
            ramp,
        }) => play(
            &config,
            &path,
            PlayOptions {
                width,
                height,
                color,
                dither,
                ramp,
            },
        ),
        Some(Command::Avatar {
            seed,
            handle,
            width,
            height,
            color,
        }) => avatar(&config, seed, handle.as_deref(), (width, height), color),
        Some(Command::Config { action }) => handle_config_action(&config, config_path, action),
    }
}
