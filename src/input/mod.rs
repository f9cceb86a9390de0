//! Keyboard input: key parsing, bindings and the modal dispatcher.

mod dispatcher;
mod keymap;
mod keys;

use thiserror::Error;

pub use dispatcher::{
    parse_command_line, Dispatcher, DispatcherConfig, LineAction, Mode, TimeoutPolicy,
    DEFAULT_SEQUENCE_TIMEOUT,
};
pub use keymap::{Action, KeyMap, Lookup};
pub use keys::{parse_sequence, Key, KeyPress};

/// Problems with key input or binding configuration.
///
/// At runtime these are logged and dropped; only configuration loading
/// surfaces them to the user.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("empty key sequence")]
    EmptySequence,

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("key sequence '{0}' did not complete")]
    Unterminated(String),
}
