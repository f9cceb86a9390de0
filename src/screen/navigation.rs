//! Active screen, back history and per-screen focus.

use std::collections::VecDeque;

use super::{FocusJump, Screen, SCREEN_COUNT};

pub const DEFAULT_HISTORY_CAP: usize = 32;

/// Navigation state. Every mutation keeps two invariants: the history never
/// holds more than `cap` screens, and each focus index lies in
/// `0..item_count` (or is 0 for an empty list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    active: Screen,
    history: VecDeque<Screen>,
    cap: usize,
    focus: [usize; SCREEN_COUNT],
    counts: [usize; SCREEN_COUNT],
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl NavigationState {
    pub fn new(history_cap: usize) -> Self {
        Self {
            active: Screen::Timeline,
            history: VecDeque::with_capacity(history_cap.min(64)),
            cap: history_cap,
            focus: [0; SCREEN_COUNT],
            counts: [0; SCREEN_COUNT],
        }
    }

    pub fn active(&self) -> Screen {
        self.active
    }

    /// Previously active screens, oldest first.
    pub fn history(&self) -> impl Iterator<Item = Screen> + '_ {
        self.history.iter().copied()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_cap(&self) -> usize {
        self.cap
    }

    pub fn focus(&self, screen: Screen) -> usize {
        self.focus[screen.index()]
    }

    pub fn active_focus(&self) -> usize {
        self.focus(self.active)
    }

    pub fn item_count(&self, screen: Screen) -> usize {
        self.counts[screen.index()]
    }

    /// Switch to `screen`, remembering the current one. Returns `false`
    /// (and changes nothing) if `screen` is already active.
    pub fn navigate_to(&mut self, screen: Screen) -> bool {
        if screen == self.active {
            return false;
        }
        self.push_history(self.active);
        self.active = screen;
        self.focus[screen.index()] = 0;
        true
    }

    /// Return to the most recent screen in history. The restored screen
    /// keeps the focus it had. Returns `false` when history is empty.
    pub fn back(&mut self) -> bool {
        match self.history.pop_back() {
            Some(previous) => {
                self.active = previous;
                self.clamp(previous);
                true
            }
            None => false,
        }
    }

    pub fn move_focus(&mut self, delta: isize) {
        let i = self.active.index();
        let last = self.counts[i].saturating_sub(1);
        let moved = (self.focus[i] as isize).saturating_add(delta);
        self.focus[i] = moved.clamp(0, last as isize) as usize;
    }

    pub fn jump_focus(&mut self, jump: FocusJump) {
        let i = self.active.index();
        self.focus[i] = match jump {
            FocusJump::First => 0,
            FocusJump::Last => self.counts[i].saturating_sub(1),
        };
    }

    /// Record how many items `screen` currently lists, clamping its focus.
    pub fn set_item_count(&mut self, screen: Screen, count: usize) {
        self.counts[screen.index()] = count;
        self.clamp(screen);
    }

    fn clamp(&mut self, screen: Screen) {
        let i = screen.index();
        let last = self.counts[i].saturating_sub(1);
        self.focus[i] = self.focus[i].min(last);
    }

    fn push_history(&mut self, screen: Screen) {
        if self.cap == 0 {
            return;
        }
        while self.history.len() >= self.cap {
            self.history.pop_front();
        }
        self.history.push_back(screen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let nav = NavigationState::default();
        assert_eq!(nav.active(), Screen::Timeline);
        assert_eq!(nav.history_len(), 0);
        assert_eq!(nav.active_focus(), 0);
    }

    #[test]
    fn test_navigate_pushes_history() {
        let mut nav = NavigationState::default();
        assert!(nav.navigate_to(Screen::Discover));
        assert!(nav.navigate_to(Screen::Messages));
        assert_eq!(nav.history().collect::<Vec<_>>(), vec![Screen::Timeline, Screen::Discover]);
    }

    #[test]
    fn test_navigate_to_active_is_noop() {
        let mut nav = NavigationState::default();
        assert!(!nav.navigate_to(Screen::Timeline));
        assert_eq!(nav.history_len(), 0);
    }

    #[test]
    fn test_back_on_empty_history() {
        let mut nav = NavigationState::default();
        assert!(!nav.back());
        assert_eq!(nav.active(), Screen::Timeline);
    }

    #[test]
    fn test_history_cap_drops_oldest() {
        let mut nav = NavigationState::new(2);
        nav.navigate_to(Screen::Discover);
        nav.navigate_to(Screen::Messages);
        nav.navigate_to(Screen::Settings);
        assert_eq!(nav.history().collect::<Vec<_>>(), vec![Screen::Discover, Screen::Messages]);
    }

    #[test]
    fn test_zero_cap_keeps_no_history() {
        let mut nav = NavigationState::new(0);
        nav.navigate_to(Screen::Discover);
        assert_eq!(nav.history_len(), 0);
        assert!(!nav.back());
    }

    #[test]
    fn test_focus_clamps() {
        let mut nav = NavigationState::default();
        nav.set_item_count(Screen::Timeline, 5);
        nav.move_focus(3);
        assert_eq!(nav.active_focus(), 3);
        nav.move_focus(10);
        assert_eq!(nav.active_focus(), 4);
        nav.move_focus(-100);
        assert_eq!(nav.active_focus(), 0);
        nav.move_focus(isize::MAX);
        assert_eq!(nav.active_focus(), 4);
    }

    #[test]
    fn test_empty_list_focus_is_zero() {
        let mut nav = NavigationState::default();
        nav.move_focus(3);
        assert_eq!(nav.active_focus(), 0);
        nav.jump_focus(FocusJump::Last);
        assert_eq!(nav.active_focus(), 0);
    }

    #[test]
    fn test_shrinking_list_clamps_focus() {
        let mut nav = NavigationState::default();
        nav.set_item_count(Screen::Timeline, 10);
        nav.jump_focus(FocusJump::Last);
        assert_eq!(nav.active_focus(), 9);
        nav.set_item_count(Screen::Timeline, 3);
        assert_eq!(nav.active_focus(), 2);
    }

    #[test]
    fn test_back_keeps_stored_focus() {
        let mut nav = NavigationState::default();
        nav.set_item_count(Screen::Timeline, 10);
        nav.move_focus(6);
        nav.navigate_to(Screen::Discover);
        assert!(nav.back());
        assert_eq!(nav.active(), Screen::Timeline);
        assert_eq!(nav.active_focus(), 6);
    }

    #[test]
    fn test_navigate_resets_target_focus() {
        let mut nav = NavigationState::default();
        nav.set_item_count(Screen::Discover, 10);
        nav.navigate_to(Screen::Discover);
        nav.move_focus(4);
        nav.navigate_to(Screen::Timeline);
        nav.navigate_to(Screen::Discover);
        assert_eq!(nav.active_focus(), 0);
    }
}
