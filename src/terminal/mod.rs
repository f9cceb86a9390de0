//! Terminal session management.

mod raw_mode;

pub use raw_mode::TerminalGuard;
