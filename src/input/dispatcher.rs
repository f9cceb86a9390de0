//! Turns key presses into commands.
//!
//! Normal mode walks the keymap trie, holding keys that only form a prefix
//! until they resolve or time out. Compose and command-line modes collect
//! text instead.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::media::MediaSource;
use crate::screen::{Command, Draft, FocusJump, PostAction, Screen};

use super::keymap::{Action, KeyMap, Lookup};
use super::keys::{Key, KeyPress};
use super::InputError;

/// Default wait before a pending prefix is resolved.
pub const DEFAULT_SEQUENCE_TIMEOUT: Duration = Duration::from_millis(400);

/// Focus rows assumed per page until the UI reports the real height.
const DEFAULT_PAGE_SIZE: usize = 10;

/// What happens to a held prefix when the timeout fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutPolicy {
    /// Run the longest bound prefix and replay the remaining keys.
    #[default]
    Resolve,
    /// Drop the held keys.
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub timeout: Duration,
    pub on_timeout: TimeoutPolicy,
    /// Fire an exact binding at once even if longer bindings share it.
    pub eager: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SEQUENCE_TIMEOUT,
            on_timeout: TimeoutPolicy::Resolve,
            eager: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// Typing a post or message.
    Compose,
    /// Typing a `:` command.
    CommandLine,
}

/// Result of parsing a `:` command line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineAction {
    Run(Command),
    Compose,
}

/// Parse the text typed after `:`.
pub fn parse_command_line(line: &str) -> Result<LineAction, InputError> {
    let line = line.trim();
    let (head, arg) = match line.split_once(char::is_whitespace) {
        Some((head, arg)) => (head, arg.trim()),
        None => (line, ""),
    };
    let command = match (head, arg) {
        ("q" | "quit" | "q!", "") => Command::Quit,
        ("n" | "new", "") => return Ok(LineAction::Compose),
        ("back", "") => Command::Back,
        ("cancel", "") => Command::CancelConversion,
        ("refresh" | "r", "") => Command::Refresh,
        ("view" | "play", path) if !path.is_empty() => {
            Command::StartConversion(MediaSource::file(path))
        }
        ("l" | "like", "") => Command::PostAction(PostAction::ToggleLike),
        ("rt" | "repost", "") => Command::PostAction(PostAction::ToggleRepost),
        ("c" | "comments", "") => Command::PostAction(PostAction::Comments),
        ("attach", path) if !path.is_empty() => Command::AttachPhoto(path.into()),
        (name, "") => {
            let screen = name
                .chars()
                .next()
                .filter(|_| name.chars().count() == 1)
                .and_then(Screen::from_digit)
                .or_else(|| Screen::from_name(name))
                .ok_or_else(|| InputError::UnknownCommand(line.to_string()))?;
            Command::NavigateTo(screen)
        }
        _ => return Err(InputError::UnknownCommand(line.to_string())),
    };
    Ok(LineAction::Run(command))
}

pub struct Dispatcher {
    keymap: KeyMap,
    config: DispatcherConfig,
    mode: Mode,
    pending: Vec<KeyPress>,
    pending_since: Option<Instant>,
    ready: VecDeque<Command>,
    buffer: String,
    page_size: usize,
}

impl Dispatcher {
    pub fn new(keymap: KeyMap, config: DispatcherConfig) -> Self {
        Self {
            keymap,
            config,
            mode: Mode::Normal,
            pending: Vec::new(),
            pending_since: None,
            ready: VecDeque::new(),
            buffer: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Text typed so far in compose or command-line mode.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Keys held while waiting for a longer binding.
    pub fn pending(&self) -> &[KeyPress] {
        &self.pending
    }

    /// Rows visible in the focused list; half-page moves use half of it.
    pub fn set_page_size(&mut self, rows: usize) {
        self.page_size = rows.max(1);
    }

    /// When the held prefix times out, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending_since.map(|t| t + self.config.timeout)
    }

    /// Feed one key press. Returns the first command it produced; any
    /// further commands come out of [`poll`](Self::poll).
    pub fn dispatch(&mut self, key: KeyPress, now: Instant) -> Option<Command> {
        self.process(key, now);
        self.ready.pop_front()
    }

    /// Return a queued command, or resolve a held prefix whose timeout has
    /// passed.
    pub fn poll(&mut self, now: Instant) -> Option<Command> {
        if let Some(command) = self.ready.pop_front() {
            return Some(command);
        }
        if self.deadline().is_some_and(|d| now >= d) {
            match self.config.on_timeout {
                TimeoutPolicy::Resolve => self.resolve_pending(now),
                TimeoutPolicy::Discard => self.discard_pending(),
            }
        }
        self.ready.pop_front()
    }

    fn process(&mut self, key: KeyPress, now: Instant) {
        match self.mode {
            Mode::Normal => self.process_normal(key, now),
            Mode::Compose => self.process_compose(key),
            Mode::CommandLine => self.process_command_line(key),
        }
    }

    fn process_normal(&mut self, key: KeyPress, now: Instant) {
        let mut seq = self.pending.clone();
        seq.push(key);

        match self.keymap.lookup(&seq) {
            Lookup::Exact(action) => {
                self.clear_pending();
                self.fire(action);
            }
            Lookup::Ambiguous(action) if self.config.eager => {
                self.clear_pending();
                self.fire(action);
            }
            Lookup::Ambiguous(_) | Lookup::Prefix => {
                self.pending = seq;
                self.pending_since = Some(now);
            }
            Lookup::NoMatch if self.pending.is_empty() => {
                log::trace!("ignoring unbound key {key}");
            }
            Lookup::NoMatch => {
                match self.config.on_timeout {
                    TimeoutPolicy::Resolve => self.resolve_pending(now),
                    TimeoutPolicy::Discard => self.discard_pending(),
                }
                self.process(key, now);
            }
        }
    }

    /// Fire the longest bound prefix of the held keys, then replay the rest.
    fn resolve_pending(&mut self, now: Instant) {
        let held = std::mem::take(&mut self.pending);
        self.pending_since = None;
        match self.keymap.longest_match(&held) {
            Some((len, action)) => {
                self.fire(action);
                for key in &held[len..] {
                    self.process(*key, now);
                }
            }
            None => log::debug!("{}", InputError::Unterminated(describe(&held))),
        }
    }

    fn discard_pending(&mut self) {
        let held = std::mem::take(&mut self.pending);
        self.pending_since = None;
        if !held.is_empty() {
            log::debug!("{}", InputError::Unterminated(describe(&held)));
        }
    }

    fn clear_pending(&mut self) {
        self.pending.clear();
        self.pending_since = None;
    }

    fn fire(&mut self, action: Action) {
        let half = (self.page_size / 2).max(1) as isize;
        let command = match action {
            Action::Screen(screen) => Command::NavigateTo(screen),
            Action::FocusDown => Command::MoveFocus(1),
            Action::FocusUp => Command::MoveFocus(-1),
            Action::HalfPageDown => Command::MoveFocus(half),
            Action::HalfPageUp => Command::MoveFocus(-half),
            Action::FocusFirst => Command::JumpFocus(FocusJump::First),
            Action::FocusLast => Command::JumpFocus(FocusJump::Last),
            Action::Select => Command::Select,
            Action::Back => Command::Back,
            Action::Quit => Command::Quit,
            Action::Refresh => Command::Refresh,
            Action::CancelConversion => Command::CancelConversion,
            Action::Compose => return self.enter(Mode::Compose),
            Action::CommandLine => return self.enter(Mode::CommandLine),
            Action::Post(action) => Command::PostAction(action),
        };
        self.ready.push_back(command);
    }

    fn enter(&mut self, mode: Mode) {
        log::debug!("input mode {:?} -> {:?}", self.mode, mode);
        self.clear_pending();
        self.buffer.clear();
        self.mode = mode;
    }

    fn process_compose(&mut self, key: KeyPress) {
        match key.key {
            Key::Esc => {
                log::debug!("compose abandoned");
                self.enter(Mode::Normal);
            }
            Key::Enter => {
                let text = self.buffer.trim().to_string();
                self.enter(Mode::Normal);
                if !text.is_empty() {
                    self.ready.push_back(Command::Submit(Draft::new(text)));
                }
            }
            Key::Backspace => {
                self.buffer.pop();
            }
            Key::Char('u') if key.ctrl => self.buffer.clear(),
            _ => {
                if let Some(c) = key.text() {
                    self.buffer.push(c);
                }
            }
        }
    }

    fn process_command_line(&mut self, key: KeyPress) {
        match key.key {
            Key::Esc => self.enter(Mode::Normal),
            Key::Backspace if self.buffer.is_empty() => self.enter(Mode::Normal),
            Key::Backspace => {
                self.buffer.pop();
            }
            Key::Enter => {
                let line = std::mem::take(&mut self.buffer);
                self.enter(Mode::Normal);
                match parse_command_line(&line) {
                    Ok(LineAction::Run(command)) => self.ready.push_back(command),
                    Ok(LineAction::Compose) => self.enter(Mode::Compose),
                    Err(e) => log::debug!("{e}"),
                }
            }
            _ => {
                if let Some(c) = key.text() {
                    self.buffer.push(c);
                }
            }
        }
    }
}

fn describe(keys: &[KeyPress]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
