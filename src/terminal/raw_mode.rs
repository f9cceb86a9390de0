//! Raw mode and alternate screen with panic-safe cleanup.

use crossterm::cursor::{Hide, Show};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use std::io;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set while the terminal is in raw mode, so the panic hook knows to undo it.
pub(crate) static TERMINAL_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Restores the terminal when dropped, including on early returns and
/// panics.
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    /// Enter raw mode and the alternate screen, hiding the cursor.
    ///
    /// # Errors
    /// Fails when stdout is not a terminal.
    pub fn enter() -> io::Result<Self> {
        install_panic_hook();

        enable_raw_mode()?;
        TERMINAL_ACTIVE.store(true, Ordering::SeqCst);
        if let Err(e) = crossterm::execute!(io::stdout(), EnterAlternateScreen, Hide) {
            restore();
            return Err(e);
        }
        log::debug!("terminal entered raw mode");
        Ok(Self { active: true })
    }

    /// Restore the terminal now. Dropping the guard afterwards is a no-op.
    pub fn exit(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        TERMINAL_ACTIVE.store(false, Ordering::SeqCst);
        crossterm::execute!(io::stdout(), Show, LeaveAlternateScreen)?;
        disable_raw_mode()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            restore();
        }
    }
}

fn restore() {
    TERMINAL_ACTIVE.store(false, Ordering::SeqCst);
    let _ = crossterm::execute!(io::stdout(), Show, LeaveAlternateScreen);
    let _ = disable_raw_mode();
}

/// Restore the terminal before the default hook prints the panic message.
pub(crate) fn install_panic_hook() {
    static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        if TERMINAL_ACTIVE.load(Ordering::SeqCst) {
            restore();
        }
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_enter_and_exit() {
        // Needs a real TTY; CI runs without one.
        match TerminalGuard::enter() {
            Ok(mut guard) => {
                assert!(TERMINAL_ACTIVE.load(Ordering::SeqCst));
                guard.exit().expect("exit raw mode");
                assert!(!TERMINAL_ACTIVE.load(Ordering::SeqCst));
                drop(guard);
                assert!(!TERMINAL_ACTIVE.load(Ordering::SeqCst));
            }
            Err(e) => eprintln!("Skipping test (no TTY): {}", e),
        }
    }

    #[test]
    fn test_panic_hook_installs_once() {
        install_panic_hook();
        install_panic_hook();
    }
}
