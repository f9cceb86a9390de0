//! Screens, commands and the navigation state machine.

mod manager;
mod navigation;

use std::fmt;
use std::path::PathBuf;

use crate::media::MediaSource;

pub use manager::{Effect, ScreenError, ScreenManager, SubmitTarget, Submission};
pub use navigation::{NavigationState, DEFAULT_HISTORY_CAP};

pub(crate) const SCREEN_COUNT: usize = 5;

/// The fixed set of top-level screens, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Screen {
    Timeline,
    Discover,
    Messages,
    Notifications,
    Settings,
}

impl Screen {
    pub const ALL: [Screen; SCREEN_COUNT] = [
        Screen::Timeline,
        Screen::Discover,
        Screen::Messages,
        Screen::Notifications,
        Screen::Settings,
    ];

    /// Position in [`Screen::ALL`].
    pub fn index(self) -> usize {
        match self {
            Screen::Timeline => 0,
            Screen::Discover => 1,
            Screen::Messages => 2,
            Screen::Notifications => 3,
            Screen::Settings => 4,
        }
    }

    /// The number key that opens this screen.
    pub fn digit(self) -> char {
        match self {
            Screen::Timeline => '1',
            Screen::Discover => '2',
            Screen::Messages => '3',
            Screen::Notifications => '4',
            Screen::Settings => '5',
        }
    }

    pub fn from_digit(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.digit() == c)
    }

    pub fn name(self) -> &'static str {
        match self {
            Screen::Timeline => "timeline",
            Screen::Discover => "discover",
            Screen::Messages => "messages",
            Screen::Notifications => "notifications",
            Screen::Settings => "settings",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::Timeline => "Timeline",
            Screen::Discover => "Discover",
            Screen::Messages => "Messages",
            Screen::Notifications => "Notifications",
            Screen::Settings => "Settings",
        }
    }

    /// Whether the screen shows data loaded from the backend.
    pub fn has_feed(self) -> bool {
        !matches!(self, Screen::Settings)
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusJump {
    First,
    Last,
}

/// Text finished in compose mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
}

impl Draft {
    pub fn new(text: String) -> Self {
        Self { text }
    }
}

/// A request to open the focused item on a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub screen: Screen,
    pub index: usize,
}

/// Something done to the focused post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostAction {
    /// Like, or take a like back.
    ToggleLike,
    /// Repost, or undo a repost.
    ToggleRepost,
    /// Show the comments under the post.
    Comments,
}

impl PostAction {
    pub fn name(self) -> &'static str {
        match self {
            PostAction::ToggleLike => "like",
            PostAction::ToggleRepost => "repost",
            PostAction::Comments => "comments",
        }
    }
}

/// Everything the input layer can ask of the screen manager.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NavigateTo(Screen),
    MoveFocus(isize),
    JumpFocus(FocusJump),
    Select,
    Back,
    Quit,
    StartConversion(MediaSource),
    CancelConversion,
    Refresh,
    Submit(Draft),
    PostAction(PostAction),
    /// Convert a picture and hold it for the next post.
    AttachPhoto(PathBuf),
}
