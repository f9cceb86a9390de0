//! Key presses as the dispatcher sees them.

use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::InputError;

/// A key without modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    Delete,
}

/// A key plus the modifiers that matter for bindings.
///
/// Shift is folded into the character (`G` rather than `shift+g`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
    pub alt: bool,
}

impl KeyPress {
    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            alt: false,
        }
    }

    pub const fn char(c: char) -> Self {
        Self::plain(Key::Char(c))
    }

    pub const fn ctrl(c: char) -> Self {
        Self {
            key: Key::Char(c),
            ctrl: true,
            alt: false,
        }
    }

    /// The character this press would type into a text buffer.
    pub fn text(&self) -> Option<char> {
        match self.key {
            Key::Char(c) if !self.ctrl && !self.alt => Some(c),
            _ => None,
        }
    }

    /// Convert a crossterm event. Releases and keys we never bind give `None`.
    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        let key = match event.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Esc => Key::Esc,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Tab => Key::Tab,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::Delete => Key::Delete,
            _ => return None,
        };
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let key = match key {
            // terminals report ctrl+d as 'd' or 'D' depending on shift state
            Key::Char(c) if ctrl => Key::Char(c.to_ascii_lowercase()),
            other => other,
        };
        Some(Self {
            key,
            ctrl,
            alt: event.modifiers.contains(KeyModifiers::ALT),
        })
    }

    /// Parse one key in binding notation: `j`, `G`, `ctrl+d`, `alt+x`,
    /// `enter`, `esc`, `space`, `up`.
    pub fn parse(s: &str) -> Result<Self, InputError> {
        let unknown = || InputError::UnknownKey(s.to_string());
        let mut ctrl = false;
        let mut alt = false;
        let mut rest = s.trim();
        if rest.is_empty() {
            return Err(unknown());
        }
        loop {
            let lower = rest.to_ascii_lowercase();
            if rest.len() > 1 && (lower.starts_with("ctrl+") || lower.starts_with("c-")) {
                ctrl = true;
                rest = &rest[rest.find(['+', '-']).map_or(0, |i| i + 1)..];
            } else if rest.len() > 1 && (lower.starts_with("alt+") || lower.starts_with("m-")) {
                alt = true;
                rest = &rest[rest.find(['+', '-']).map_or(0, |i| i + 1)..];
            } else {
                break;
            }
        }

        let mut chars = rest.chars();
        let key = match (chars.next(), chars.next()) {
            (Some(c), None) => Key::Char(if ctrl { c.to_ascii_lowercase() } else { c }),
            _ => match rest.to_ascii_lowercase().as_str() {
                "enter" | "return" | "cr" => Key::Enter,
                "esc" | "escape" => Key::Esc,
                "backspace" | "bs" => Key::Backspace,
                "tab" => Key::Tab,
                "space" => Key::Char(' '),
                "up" => Key::Up,
                "down" => Key::Down,
                "left" => Key::Left,
                "right" => Key::Right,
                "pageup" | "pgup" => Key::PageUp,
                "pagedown" | "pgdn" => Key::PageDown,
                "home" => Key::Home,
                "end" => Key::End,
                "delete" | "del" => Key::Delete,
                _ => return Err(unknown()),
            },
        };
        Ok(Self { key, ctrl, alt })
    }
}

/// Parse a space separated key sequence such as `g g` or `ctrl+w j`.
pub fn parse_sequence(s: &str) -> Result<Vec<KeyPress>, InputError> {
    let keys = s
        .split_whitespace()
        .map(KeyPress::parse)
        .collect::<Result<Vec<_>, _>>()?;
    if keys.is_empty() {
        return Err(InputError::EmptySequence);
    }
    Ok(keys)
}

impl fmt::Display for KeyPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "ctrl+")?;
        }
        if self.alt {
            write!(f, "alt+")?;
        }
        match self.key {
            Key::Char(' ') => write!(f, "space"),
            Key::Char(c) => write!(f, "{c}"),
            Key::Enter => write!(f, "enter"),
            Key::Esc => write!(f, "esc"),
            Key::Backspace => write!(f, "backspace"),
            Key::Tab => write!(f, "tab"),
            Key::Up => write!(f, "up"),
            Key::Down => write!(f, "down"),
            Key::Left => write!(f, "left"),
            Key::Right => write!(f, "right"),
            Key::PageUp => write!(f, "pageup"),
            Key::PageDown => write!(f, "pagedown"),
            Key::Home => write!(f, "home"),
            Key::End => write!(f, "end"),
            Key::Delete => write!(f, "delete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_parse_single_chars() {
        assert_eq!(KeyPress::parse("j").unwrap(), KeyPress::char('j'));
        assert_eq!(KeyPress::parse("G").unwrap(), KeyPress::char('G'));
        assert_eq!(KeyPress::parse(":").unwrap(), KeyPress::char(':'));
        assert_eq!(KeyPress::parse("-").unwrap(), KeyPress::char('-'));
    }

    #[test]
    fn test_parse_modifiers() {
        assert_eq!(KeyPress::parse("ctrl+d").unwrap(), KeyPress::ctrl('d'));
        assert_eq!(KeyPress::parse("C-u").unwrap(), KeyPress::ctrl('u'));
        let alt = KeyPress::parse("alt+x").unwrap();
        assert!(alt.alt && !alt.ctrl);
    }

    #[test]
    fn test_parse_named_keys() {
        assert_eq!(KeyPress::parse("enter").unwrap(), KeyPress::plain(Key::Enter));
        assert_eq!(KeyPress::parse("Esc").unwrap(), KeyPress::plain(Key::Esc));
        assert_eq!(KeyPress::parse("space").unwrap(), KeyPress::char(' '));
        assert!(matches!(KeyPress::parse("hyper"), Err(InputError::UnknownKey(_))));
        assert!(KeyPress::parse("").is_err());
    }

    #[test]
    fn test_parse_sequence() {
        let seq = parse_sequence("g  g").unwrap();
        assert_eq!(seq, vec![KeyPress::char('g'), KeyPress::char('g')]);
        assert!(matches!(parse_sequence("   "), Err(InputError::EmptySequence)));
    }

    #[test]
    fn test_display_round_trips() {
        for s in ["j", "ctrl+d", "enter", "space", "G", "alt+x"] {
            let key = KeyPress::parse(s).unwrap();
            assert_eq!(KeyPress::parse(&key.to_string()).unwrap(), key);
        }
    }

    #[test]
    fn test_from_event() {
        let key = KeyPress::from_event(&event(KeyCode::Char('D'), KeyModifiers::CONTROL | KeyModifiers::SHIFT));
        assert_eq!(key, Some(KeyPress::ctrl('d')));
        let key = KeyPress::from_event(&event(KeyCode::Char('G'), KeyModifiers::SHIFT));
        assert_eq!(key, Some(KeyPress::char('G')));
        assert_eq!(KeyPress::from_event(&event(KeyCode::F(5), KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_text_ignores_chords() {
        assert_eq!(KeyPress::char('a').text(), Some('a'));
        assert_eq!(KeyPress::ctrl('a').text(), None);
        assert_eq!(KeyPress::plain(Key::Enter).text(), None);
    }
}
