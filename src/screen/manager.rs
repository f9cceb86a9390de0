//! The screen state machine.
//!
//! Commands are applied one at a time and either fully succeed or change
//! nothing. A transition never performs I/O; it returns an [`Effect`] that
//! the event loop carries out.

use thiserror::Error;

use std::path::PathBuf;

use crate::backend::SessionContext;
use crate::media::MediaSource;

use super::navigation::NavigationState;
use super::{Command, Draft, PostAction, Screen, Selection};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScreenError {
    #[error("screen manager has quit; rejected {0}")]
    Terminated(String),
}

/// Where a finished draft goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTarget {
    /// A new public post.
    Post,
    /// A direct message in the conversation at this list position.
    Message { conversation: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub draft: Draft,
    pub target: SubmitTarget,
}

/// Work requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Load the first page of a screen's feed.
    Load(Screen),
    /// Open the focused item.
    Open(Selection),
    Submit(Submission),
    /// Act on the focused post of a post list.
    PostAction(Selection, PostAction),
    AttachPhoto(PathBuf),
    StartConversion(MediaSource),
    CancelConversion,
    Quit,
}

#[derive(Debug)]
pub struct ScreenManager {
    nav: NavigationState,
    session: SessionContext,
    epoch: u64,
    last_selection: Option<Selection>,
    terminated: bool,
}

impl ScreenManager {
    pub fn new(history_cap: usize, session: SessionContext) -> Self {
        Self {
            nav: NavigationState::new(history_cap),
            session,
            epoch: 0,
            last_selection: None,
            terminated: false,
        }
    }

    pub fn active(&self) -> Screen {
        self.nav.active()
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Replace the session, e.g. after a token was stored.
    pub fn set_session(&mut self, session: SessionContext) {
        self.session = session;
        self.epoch += 1;
    }

    /// Bumped whenever the active screen or session changes. Fetch results
    /// issued under an older epoch are stale.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// The most recent selection request.
    pub fn last_selection(&self) -> Option<Selection> {
        self.last_selection
    }

    /// Without a token every screen shows the sign-in placeholder.
    pub fn shows_login_placeholder(&self) -> bool {
        !self.session.is_authenticated()
    }

    /// Report how many items a screen lists; focus is clamped to fit.
    pub fn set_item_count(&mut self, screen: Screen, count: usize) {
        self.nav.set_item_count(screen, count);
    }

    /// The effect that loads the active screen, if it has a feed and the
    /// user is signed in.
    pub fn initial_effect(&self) -> Option<Effect> {
        self.load(self.nav.active())
    }

    fn load(&self, screen: Screen) -> Option<Effect> {
        (screen.has_feed() && self.session.is_authenticated()).then_some(Effect::Load(screen))
    }

    /// Apply one command.
    pub fn apply(&mut self, command: Command) -> Result<Option<Effect>, ScreenError> {
        if self.terminated {
            return Err(ScreenError::Terminated(format!("{command:?}")));
        }
        let authenticated = self.session.is_authenticated();

        let effect = match command {
            Command::NavigateTo(screen) => {
                if !self.nav.navigate_to(screen) {
                    return Ok(None);
                }
                self.epoch += 1;
                log::debug!("screen -> {screen}");
                self.load(screen)
            }
            Command::Back => {
                if !self.nav.back() {
                    return Ok(None);
                }
                self.epoch += 1;
                log::debug!("back -> {}", self.nav.active());
                self.load(self.nav.active())
            }
            Command::MoveFocus(delta) => {
                self.nav.move_focus(delta);
                None
            }
            Command::JumpFocus(jump) => {
                self.nav.jump_focus(jump);
                None
            }
            Command::Select => {
                let selection = Selection {
                    screen: self.nav.active(),
                    index: self.nav.active_focus(),
                };
                self.last_selection = Some(selection);
                (authenticated && self.nav.item_count(selection.screen) > 0)
                    .then_some(Effect::Open(selection))
            }
            Command::Refresh => self.load(self.nav.active()),
            Command::Submit(draft) => {
                let target = match self.nav.active() {
                    Screen::Messages if self.nav.item_count(Screen::Messages) > 0 => {
                        SubmitTarget::Message {
                            conversation: self.nav.active_focus(),
                        }
                    }
                    _ => SubmitTarget::Post,
                };
                authenticated.then_some(Effect::Submit(Submission { draft, target }))
            }
            Command::PostAction(action) => {
                let selection = Selection {
                    screen: self.nav.active(),
                    index: self.nav.active_focus(),
                };
                let lists_posts = matches!(selection.screen, Screen::Timeline | Screen::Discover);
                (authenticated && lists_posts && self.nav.item_count(selection.screen) > 0)
                    .then_some(Effect::PostAction(selection, action))
            }
            Command::AttachPhoto(path) => authenticated.then_some(Effect::AttachPhoto(path)),
            Command::StartConversion(source) => Some(Effect::StartConversion(source)),
            Command::CancelConversion => Some(Effect::CancelConversion),
            Command::Quit => {
                self.terminated = true;
                log::info!("quit requested");
                Some(Effect::Quit)
            }
        };
        Ok(effect)
    }
}
