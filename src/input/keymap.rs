//! Key sequence bindings stored as a trie.

use std::collections::HashMap;
use std::fmt;

use crate::screen::{PostAction, Screen};

use super::keys::{parse_sequence, Key, KeyPress};
use super::InputError;

/// Something a key sequence can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Screen(Screen),
    FocusDown,
    FocusUp,
    HalfPageDown,
    HalfPageUp,
    FocusFirst,
    FocusLast,
    Select,
    Back,
    Quit,
    Refresh,
    CancelConversion,
    Compose,
    CommandLine,
    Post(PostAction),
}

impl Action {
    /// Parse an action name as used in `[keys.bindings]`.
    pub fn from_name(name: &str) -> Result<Self, InputError> {
        let name = name.trim().to_ascii_lowercase();
        if let Some(screen) = name.strip_prefix("screen-").and_then(Screen::from_name) {
            return Ok(Action::Screen(screen));
        }
        Ok(match name.as_str() {
            "focus-down" | "down" => Action::FocusDown,
            "focus-up" | "up" => Action::FocusUp,
            "half-page-down" => Action::HalfPageDown,
            "half-page-up" => Action::HalfPageUp,
            "focus-first" | "top" => Action::FocusFirst,
            "focus-last" | "bottom" => Action::FocusLast,
            "select" | "open" => Action::Select,
            "back" => Action::Back,
            "quit" => Action::Quit,
            "refresh" => Action::Refresh,
            "cancel" | "cancel-conversion" => Action::CancelConversion,
            "compose" => Action::Compose,
            "command-line" => Action::CommandLine,
            "like" | "toggle-like" => Action::Post(PostAction::ToggleLike),
            "repost" | "toggle-repost" => Action::Post(PostAction::ToggleRepost),
            "comments" => Action::Post(PostAction::Comments),
            _ => return Err(InputError::UnknownAction(name)),
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Screen(s) => write!(f, "screen-{}", s.name()),
            Action::FocusDown => write!(f, "focus-down"),
            Action::FocusUp => write!(f, "focus-up"),
            Action::HalfPageDown => write!(f, "half-page-down"),
            Action::HalfPageUp => write!(f, "half-page-up"),
            Action::FocusFirst => write!(f, "focus-first"),
            Action::FocusLast => write!(f, "focus-last"),
            Action::Select => write!(f, "select"),
            Action::Back => write!(f, "back"),
            Action::Quit => write!(f, "quit"),
            Action::Refresh => write!(f, "refresh"),
            Action::CancelConversion => write!(f, "cancel-conversion"),
            Action::Compose => write!(f, "compose"),
            Action::CommandLine => write!(f, "command-line"),
            Action::Post(action) => f.write_str(action.name()),
        }
    }
}

/// Result of looking up a key sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Nothing starts with this sequence.
    NoMatch,
    /// Longer bindings start with it, but it is not bound itself.
    Prefix,
    /// Bound, and nothing longer shares the prefix.
    Exact(Action),
    /// Bound, and longer bindings also start with it.
    Ambiguous(Action),
}

#[derive(Debug, Default, Clone)]
struct Node {
    action: Option<Action>,
    children: HashMap<KeyPress, Node>,
}

#[derive(Debug, Default, Clone)]
pub struct KeyMap {
    root: Node,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `keys` to `action`, replacing any previous binding of exactly
    /// that sequence. An empty sequence is ignored.
    pub fn bind(&mut self, keys: &[KeyPress], action: Action) {
        if keys.is_empty() {
            return;
        }
        let mut node = &mut self.root;
        for key in keys {
            node = node.children.entry(*key).or_default();
        }
        node.action = Some(action);
    }

    /// Bind from config notation: `bind_str("g g", "focus-first")`.
    pub fn bind_str(&mut self, keys: &str, action: &str) -> Result<(), InputError> {
        let seq = parse_sequence(keys)?;
        let action = Action::from_name(action)?;
        self.bind(&seq, action);
        Ok(())
    }

    /// Remove the binding for exactly `keys`. Longer bindings stay.
    pub fn unbind(&mut self, keys: &[KeyPress]) {
        let mut node = &mut self.root;
        for key in keys {
            match node.children.get_mut(key) {
                Some(next) => node = next,
                None => return,
            }
        }
        node.action = None;
    }

    pub fn lookup(&self, keys: &[KeyPress]) -> Lookup {
        let mut node = &self.root;
        for key in keys {
            match node.children.get(key) {
                Some(next) => node = next,
                None => return Lookup::NoMatch,
            }
        }
        match (node.action, node.children.is_empty()) {
            (Some(action), true) => Lookup::Exact(action),
            (Some(action), false) => Lookup::Ambiguous(action),
            (None, false) => Lookup::Prefix,
            (None, true) => Lookup::NoMatch,
        }
    }

    /// Longest bound prefix of `keys` as `(length, action)`.
    pub fn longest_match(&self, keys: &[KeyPress]) -> Option<(usize, Action)> {
        let mut node = &self.root;
        let mut best = None;
        for (i, key) in keys.iter().enumerate() {
            match node.children.get(key) {
                Some(next) => node = next,
                None => break,
            }
            if let Some(action) = node.action {
                best = Some((i + 1, action));
            }
        }
        best
    }

    /// The stock vim-flavoured bindings.
    pub fn defaults() -> Self {
        let mut map = Self::new();
        for screen in Screen::ALL {
            map.bind(&[KeyPress::char(screen.digit())], Action::Screen(screen));
        }

        let g = KeyPress::char('g');
        map.bind(&[g, KeyPress::char('t')], Action::Screen(Screen::Timeline));
        map.bind(&[g, KeyPress::char('d')], Action::Screen(Screen::Discover));
        map.bind(&[g, KeyPress::char('m')], Action::Screen(Screen::Messages));
        map.bind(&[g, KeyPress::char('n')], Action::Screen(Screen::Notifications));
        map.bind(&[g, KeyPress::char('s')], Action::Screen(Screen::Settings));
        map.bind(&[g, g], Action::FocusFirst);
        map.bind(&[KeyPress::char('G')], Action::FocusLast);

        map.bind(&[KeyPress::char('j')], Action::FocusDown);
        map.bind(&[KeyPress::plain(Key::Down)], Action::FocusDown);
        map.bind(&[KeyPress::char('k')], Action::FocusUp);
        map.bind(&[KeyPress::plain(Key::Up)], Action::FocusUp);
        map.bind(&[KeyPress::ctrl('d')], Action::HalfPageDown);
        map.bind(&[KeyPress::plain(Key::PageDown)], Action::HalfPageDown);
        map.bind(&[KeyPress::ctrl('u')], Action::HalfPageUp);
        map.bind(&[KeyPress::plain(Key::PageUp)], Action::HalfPageUp);
        map.bind(&[KeyPress::plain(Key::Home)], Action::FocusFirst);
        map.bind(&[KeyPress::plain(Key::End)], Action::FocusLast);

        map.bind(&[KeyPress::plain(Key::Enter)], Action::Select);
        map.bind(&[KeyPress::plain(Key::Backspace)], Action::Back);
        map.bind(&[KeyPress::plain(Key::Esc)], Action::CancelConversion);
        map.bind(&[KeyPress::char('q')], Action::Quit);
        map.bind(&[KeyPress::char('r')], Action::Refresh);
        map.bind(&[KeyPress::char('i')], Action::Compose);
        map.bind(&[KeyPress::char(':')], Action::CommandLine);

        map.bind(&[KeyPress::char('l')], Action::Post(PostAction::ToggleLike));
        map.bind(&[KeyPress::char('t')], Action::Post(PostAction::ToggleRepost));
        map.bind(&[KeyPress::char('c')], Action::Post(PostAction::Comments));
        map
    }
}
