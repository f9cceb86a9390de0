//! Logical UI state.
//!
//! [`App`] owns the screen manager and everything fetched or converted so
//! far. It never performs I/O: the event loop turns [`Request`]s into
//! tasks and feeds their results back through [`App::apply_fetch`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use crate::ascii::Frame;
use crate::backend::{
    Comment, Conversation, Cursor, FetchError, FetchResult, Notification, OpenTarget, Outgoing, Page,
    Post, SessionContext, Thread,
};
use crate::input::Mode;
use crate::media::{ConversionJob, JobEvent, JobStatus};
use crate::screen::{Effect, PostAction, Screen, ScreenManager, Selection, SubmitTarget, Submission};

/// Rows left below the focus before the next page is requested.
const PREFETCH_MARGIN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// One screen's list and its paging state.
#[derive(Debug, Clone)]
pub struct Feed<T> {
    items: Vec<T>,
    next: Option<Cursor>,
    status: LoadStatus,
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next: None,
            status: LoadStatus::Idle,
        }
    }
}

impl<T> Feed<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn next(&self) -> Option<&Cursor> {
        self.next.as_ref()
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    fn finish_page(&mut self, page: Page<T>, append: bool) {
        if append {
            self.items.extend(page.items);
        } else {
            self.items = page.items;
        }
        self.next = page.next;
        self.status = LoadStatus::Ready;
    }

    fn finish_all(&mut self, items: Vec<T>) {
        self.finish_page(Page::last(items), false);
    }

    fn fail(&mut self, error: &FetchError) {
        self.status = LoadStatus::Failed(error.to_string());
    }
}

/// Work the event loop should start on the app's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Load { screen: Screen, cursor: Option<Cursor> },
    Thread { conversation_id: String },
    Open(OpenTarget),
    Submit(Outgoing),
    Comments { post_id: String },
    /// Convert a picture for the next post.
    Photo(PathBuf),
}

/// Result of a finished request.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Posts {
        screen: Screen,
        append: bool,
        result: FetchResult<Page<Post>>,
    },
    Conversations(FetchResult<Vec<Conversation>>),
    Notifications {
        append: bool,
        result: FetchResult<Page<Notification>>,
    },
    Thread(FetchResult<Thread>),
    Opened(FetchResult<String>),
    Submitted {
        outgoing: Outgoing,
        result: FetchResult<String>,
    },
    Comments {
        post_id: String,
        result: FetchResult<Vec<Comment>>,
    },
    Photo(Result<Arc<Frame>, String>),
}

impl FetchOutcome {
    /// Content actions are reported whatever screen is showing; list data
    /// only matters to the screen that asked for it. Comments are matched
    /// against the open panel by post id instead.
    fn is_action(&self) -> bool {
        matches!(
            self,
            FetchOutcome::Opened(_)
                | FetchOutcome::Submitted { .. }
                | FetchOutcome::Comments { .. }
                | FetchOutcome::Photo(_)
        )
    }
}

/// A finished request tagged with the epoch it was issued under.
#[derive(Debug, Clone)]
pub struct FetchMessage {
    pub epoch: u64,
    pub outcome: FetchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
}

/// The media panel over the content area.
#[derive(Debug, Default)]
pub enum MediaPanel {
    #[default]
    Hidden,
    Running(ConversionJob),
    Finished {
        source: String,
        status: JobStatus,
        frame: Option<Arc<Frame>>,
    },
}

/// A post with its comments, drawn over the content area.
#[derive(Debug, Clone)]
pub struct CommentPanel {
    pub post: Post,
    pub comments: Vec<Comment>,
    pub status: LoadStatus,
}

/// Static content of the settings screen.
#[derive(Debug, Clone, Default)]
pub struct SettingsView {
    pub entries: Vec<(String, String)>,
    pub avatar: Option<Frame>,
}

#[derive(Debug)]
pub struct App {
    manager: ScreenManager,
    timeline: Feed<Post>,
    discover: Feed<Post>,
    conversations: Feed<Conversation>,
    notifications: Feed<Notification>,
    thread: Option<Thread>,
    comments: Option<CommentPanel>,
    pending_photo: Option<Arc<Frame>>,
    status: Option<StatusLine>,
    media: MediaPanel,
    settings: SettingsView,
    mode: Mode,
    input: String,
    now: SystemTime,
}

impl App {
    pub fn new(manager: ScreenManager, settings: SettingsView) -> Self {
        Self {
            manager,
            timeline: Feed::default(),
            discover: Feed::default(),
            conversations: Feed::default(),
            notifications: Feed::default(),
            thread: None,
            comments: None,
            pending_photo: None,
            status: None,
            media: MediaPanel::Hidden,
            settings,
            mode: Mode::Normal,
            input: String::new(),
            now: SystemTime::UNIX_EPOCH,
        }
    }

    pub fn manager(&self) -> &ScreenManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ScreenManager {
        &mut self.manager
    }

    pub fn active(&self) -> Screen {
        self.manager.active()
    }

    pub fn session(&self) -> &SessionContext {
        self.manager.session()
    }

    pub fn timeline(&self) -> &Feed<Post> {
        &self.timeline
    }

    pub fn discover(&self) -> &Feed<Post> {
        &self.discover
    }

    pub fn conversations(&self) -> &Feed<Conversation> {
        &self.conversations
    }

    pub fn notifications(&self) -> &Feed<Notification> {
        &self.notifications
    }

    pub fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }

    pub fn comments(&self) -> Option<&CommentPanel> {
        self.comments.as_ref()
    }

    /// Photo waiting to go out with the next post.
    pub fn pending_photo(&self) -> Option<&Arc<Frame>> {
        self.pending_photo.as_ref()
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn media(&self) -> &MediaPanel {
        &self.media
    }

    pub fn settings(&self) -> &SettingsView {
        &self.settings
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn now(&self) -> SystemTime {
        self.now
    }

    pub fn set_now(&mut self, now: SystemTime) {
        self.now = now;
    }

    /// Mirror the dispatcher's mode and buffer for the footer.
    pub fn set_input(&mut self, mode: Mode, buffer: &str) {
        self.mode = mode;
        if self.input != buffer {
            self.input.clear();
            self.input.push_str(buffer);
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.status = Some(StatusLine {
            text: text.into(),
            kind,
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Number of items the given screen lists.
    pub fn item_count(&self, screen: Screen) -> usize {
        match screen {
            Screen::Timeline => self.timeline.items.len(),
            Screen::Discover => self.discover.items.len(),
            Screen::Messages => self.conversations.items.len(),
            Screen::Notifications => self.notifications.items.len(),
            Screen::Settings => 0,
        }
    }

    pub fn load_status(&self, screen: Screen) -> Option<&LoadStatus> {
        match screen {
            Screen::Timeline => Some(&self.timeline.status),
            Screen::Discover => Some(&self.discover.status),
            Screen::Messages => Some(&self.conversations.status),
            Screen::Notifications => Some(&self.notifications.status),
            Screen::Settings => None,
        }
    }

    fn set_loading(&mut self, screen: Screen) {
        match screen {
            Screen::Timeline => self.timeline.status = LoadStatus::Loading,
            Screen::Discover => self.discover.status = LoadStatus::Loading,
            Screen::Messages => self.conversations.status = LoadStatus::Loading,
            Screen::Notifications => self.notifications.status = LoadStatus::Loading,
            Screen::Settings => {}
        }
    }

    /// Note that `request` was started.
    pub fn begin(&mut self, request: &Request) {
        match request {
            Request::Load { screen, .. } => self.set_loading(*screen),
            Request::Thread { .. } => self.thread = None,
            Request::Open(OpenTarget::Notification(n)) => {
                if let Some(stored) = self.notifications.items.iter_mut().find(|s| s.id == n.id) {
                    stored.read = true;
                }
            }
            Request::Submit(Outgoing::Like { post_id, like }) => {
                let like = *like;
                self.update_post(post_id, |p| toggle(&mut p.liked_by_me, &mut p.likes, like));
            }
            Request::Submit(Outgoing::Repost { post_id, repost }) => {
                let repost = *repost;
                self.update_post(post_id, |p| toggle(&mut p.reposted_by_me, &mut p.reposts, repost));
            }
            Request::Comments { post_id } => {
                if let Some(panel) = self.comments.as_mut().filter(|c| c.post.id == *post_id) {
                    panel.status = LoadStatus::Loading;
                } else {
                    self.comments = self.find_post(post_id).cloned().map(|post| CommentPanel {
                        post,
                        comments: Vec::new(),
                        status: LoadStatus::Loading,
                    });
                }
            }
            Request::Photo(path) => {
                self.set_status(format!("converting {}", path.display()), StatusKind::Info);
            }
            Request::Open(_) | Request::Submit(_) => {}
        }
    }

    fn find_post(&self, id: &str) -> Option<&Post> {
        self.timeline
            .items
            .iter()
            .chain(self.discover.items.iter())
            .find(|p| p.id == id)
    }

    /// Apply `f` to every copy of the post with `id`.
    fn update_post(&mut self, id: &str, f: impl Fn(&mut Post)) {
        let panel = self.comments.as_mut().map(|c| &mut c.post);
        self.timeline
            .items
            .iter_mut()
            .chain(self.discover.items.iter_mut())
            .chain(panel)
            .filter(|p| p.id == id)
            .for_each(f);
    }

    /// Turn a manager effect that needs the backend into a request. Effects
    /// the event loop handles itself give `None`.
    pub fn request_for(&self, effect: &Effect) -> Option<Request> {
        match effect {
            Effect::Load(screen) => Some(Request::Load {
                screen: *screen,
                cursor: None,
            }),
            Effect::Open(selection) => self.resolve_open(*selection),
            Effect::Submit(submission) => self.resolve_submission(submission),
            Effect::PostAction(selection, action) => self.resolve_post_action(*selection, *action),
            Effect::AttachPhoto(path) => Some(Request::Photo(path.clone())),
            Effect::StartConversion(_) | Effect::CancelConversion | Effect::Quit => None,
        }
    }

    /// What selecting an item means for each screen.
    pub fn resolve_open(&self, selection: Selection) -> Option<Request> {
        let index = selection.index;
        match selection.screen {
            Screen::Timeline => self.timeline.items.get(index).cloned().map(OpenTarget::Post).map(Request::Open),
            Screen::Discover => self.discover.items.get(index).cloned().map(OpenTarget::Post).map(Request::Open),
            Screen::Messages => self.conversations.items.get(index).map(|c| Request::Thread {
                conversation_id: c.id.clone(),
            }),
            Screen::Notifications => self
                .notifications
                .items
                .get(index)
                .cloned()
                .map(OpenTarget::Notification)
                .map(Request::Open),
            Screen::Settings => None,
        }
    }

    fn post_at(&self, selection: Selection) -> Option<&Post> {
        let feed = match selection.screen {
            Screen::Timeline => &self.timeline,
            Screen::Discover => &self.discover,
            _ => return None,
        };
        feed.items.get(selection.index)
    }

    /// Media attached to the selected post, if any.
    pub fn media_for(&self, selection: Selection) -> Option<PathBuf> {
        self.post_at(selection).and_then(|p| p.media.clone())
    }

    /// Likes and reposts flip the post's current state.
    pub fn resolve_post_action(&self, selection: Selection, action: PostAction) -> Option<Request> {
        let post = self.post_at(selection)?;
        let post_id = post.id.clone();
        Some(match action {
            PostAction::ToggleLike => Request::Submit(Outgoing::Like {
                post_id,
                like: !post.liked_by_me,
            }),
            PostAction::ToggleRepost => Request::Submit(Outgoing::Repost {
                post_id,
                repost: !post.reposted_by_me,
            }),
            PostAction::Comments => Request::Comments { post_id },
        })
    }

    /// Drafts become comments while a comment panel is open.
    pub fn resolve_submission(&self, submission: &Submission) -> Option<Request> {
        let text = submission.draft.text.clone();
        match submission.target {
            SubmitTarget::Post => Some(Request::Submit(match &self.comments {
                Some(panel) => Outgoing::Comment {
                    post_id: panel.post.id.clone(),
                    text,
                },
                None => Outgoing::Post {
                    text,
                    photo: self.pending_photo.clone(),
                },
            })),
            SubmitTarget::Message { conversation } => {
                self.conversations.items.get(conversation).map(|c| {
                    Request::Submit(Outgoing::Message {
                        conversation_id: c.id.clone(),
                        text,
                    })
                })
            }
        }
    }

    /// Next page of the active screen once the focus nears the end of
    /// what is loaded.
    pub fn more_wanted(&self) -> Option<Request> {
        let screen = self.active();
        let focus = self.manager.navigation().active_focus();
        let (len, next, status) = match screen {
            Screen::Timeline => (self.timeline.items.len(), self.timeline.next(), self.timeline.status()),
            Screen::Discover => (self.discover.items.len(), self.discover.next(), self.discover.status()),
            Screen::Notifications => (
                self.notifications.items.len(),
                self.notifications.next(),
                self.notifications.status(),
            ),
            Screen::Messages | Screen::Settings => return None,
        };
        if *status != LoadStatus::Ready || focus + PREFETCH_MARGIN < len {
            return None;
        }
        next.map(|cursor| Request::Load {
            screen,
            cursor: Some(cursor.clone()),
        })
    }

    /// Screen changes drop the open thread and comment panel.
    pub fn on_screen_change(&mut self) {
        if self.active() != Screen::Messages {
            self.thread = None;
        }
        self.comments = None;
    }

    /// Close the comment panel. Returns whether one was open.
    pub fn close_comments(&mut self) -> bool {
        self.comments.take().is_some()
    }

    /// Apply a finished request. List results from an older epoch are
    /// dropped. Returns follow-up requests.
    pub fn apply_fetch(&mut self, message: FetchMessage) -> Vec<Request> {
        let epoch = self.manager.epoch();
        if message.epoch != epoch && !message.outcome.is_action() {
            log::debug!("dropping stale fetch from epoch {} (now {})", message.epoch, epoch);
            return Vec::new();
        }

        let mut follow_up = Vec::new();
        match message.outcome {
            FetchOutcome::Posts { screen, append, result } => {
                let feed = match screen {
                    Screen::Discover => &mut self.discover,
                    _ => &mut self.timeline,
                };
                match result {
                    Ok(page) => feed.finish_page(page, append),
                    Err(e) => fail_feed(feed, &mut self.status, &e),
                }
                let count = feed.items.len();
                self.manager.set_item_count(screen, count);
            }
            FetchOutcome::Conversations(result) => {
                match result {
                    Ok(items) => self.conversations.finish_all(items),
                    Err(e) => fail_feed(&mut self.conversations, &mut self.status, &e),
                }
                let count = self.conversations.items.len();
                self.manager.set_item_count(Screen::Messages, count);
            }
            FetchOutcome::Notifications { append, result } => {
                match result {
                    Ok(page) => self.notifications.finish_page(page, append),
                    Err(e) => fail_feed(&mut self.notifications, &mut self.status, &e),
                }
                let count = self.notifications.items.len();
                self.manager.set_item_count(Screen::Notifications, count);
            }
            FetchOutcome::Thread(result) => match result {
                Ok(thread) => {
                    if let Some(c) = self.conversations.items.iter_mut().find(|c| c.id == thread.conversation_id) {
                        c.unread = false;
                    }
                    self.thread = Some(thread);
                }
                Err(e) => self.set_status(e.to_string(), StatusKind::Error),
            },
            FetchOutcome::Opened(result) => match result {
                Ok(text) => self.set_status(text, StatusKind::Info),
                Err(e) => self.set_status(e.to_string(), StatusKind::Error),
            },
            FetchOutcome::Submitted { outgoing, result } => match result {
                Ok(text) => {
                    self.set_status(text, StatusKind::Info);
                    follow_up = self.after_submit(outgoing);
                }
                Err(e) => {
                    self.revert(&outgoing);
                    self.set_status(e.to_string(), StatusKind::Error);
                }
            },
            FetchOutcome::Comments { post_id, result } => match &mut self.comments {
                Some(panel) if panel.post.id == post_id => match result {
                    Ok(comments) => {
                        panel.comments = comments;
                        panel.status = LoadStatus::Ready;
                    }
                    Err(e) => {
                        panel.status = LoadStatus::Failed(e.to_string());
                        self.set_status(e.to_string(), StatusKind::Error);
                    }
                },
                _ => log::debug!("comments for {post_id} arrived after the panel closed"),
            },
            FetchOutcome::Photo(result) => match result {
                Ok(frame) => {
                    self.set_status(
                        format!("photo attached ({}x{})", frame.width(), frame.height()),
                        StatusKind::Info,
                    );
                    self.pending_photo = Some(frame);
                }
                Err(reason) => self.set_status(reason, StatusKind::Error),
            },
        }
        follow_up
    }

    fn after_submit(&mut self, outgoing: Outgoing) -> Vec<Request> {
        let mut follow_up = Vec::new();
        match outgoing {
            Outgoing::Post { .. } | Outgoing::Message { .. } => {
                if let Outgoing::Post { .. } = outgoing {
                    self.pending_photo = None;
                }
                if let Some(Effect::Load(screen)) = self.manager.initial_effect() {
                    follow_up.push(Request::Load { screen, cursor: None });
                }
                if let Some(thread) = &self.thread {
                    follow_up.push(Request::Thread {
                        conversation_id: thread.conversation_id.clone(),
                    });
                }
            }
            Outgoing::Comment { post_id, .. } => {
                self.update_post(&post_id, |p| p.comments += 1);
                if self.comments.as_ref().is_some_and(|c| c.post.id == post_id) {
                    follow_up.push(Request::Comments { post_id });
                }
            }
            Outgoing::Like { .. } | Outgoing::Repost { .. } => {}
        }
        follow_up
    }

    /// Undo an optimistic like or repost the backend refused.
    fn revert(&mut self, outgoing: &Outgoing) {
        match outgoing {
            Outgoing::Like { post_id, like } => {
                let like = *like;
                self.update_post(post_id, |p| toggle(&mut p.liked_by_me, &mut p.likes, !like));
            }
            Outgoing::Repost { post_id, repost } => {
                let repost = *repost;
                self.update_post(post_id, |p| toggle(&mut p.reposted_by_me, &mut p.reposts, !repost));
            }
            _ => {}
        }
    }

    /// Show a new conversion, replacing whatever the panel held.
    pub fn start_conversion(&mut self, job: ConversionJob) {
        if let MediaPanel::Running(old) = std::mem::take(&mut self.media) {
            log::debug!("{} replaced by {}", old.id(), job.id());
            old.acknowledge();
        }
        if job.status().is_terminal() {
            self.finish(job);
        } else {
            self.media = MediaPanel::Running(job);
        }
    }

    /// Feed a worker event to the running job. A terminal event joins the
    /// worker and keeps the last frame on screen.
    pub fn observe(&mut self, event: &JobEvent) {
        let finished = match &mut self.media {
            MediaPanel::Running(job) => job.observe(event) && job.status().is_terminal(),
            _ => false,
        };
        if !finished {
            return;
        }
        if let MediaPanel::Running(job) = std::mem::take(&mut self.media) {
            self.finish(job);
        }
    }

    fn finish(&mut self, job: ConversionJob) {
        let source = job.source().to_string();
        let frame = job.latest_frame().cloned();
        let id = job.id();
        let status = job.acknowledge();
        log::info!("{id} finished: {}", status.label());
        if let JobStatus::Failed(reason) = &status {
            self.set_status(reason.clone(), StatusKind::Error);
        }
        self.media = MediaPanel::Finished { source, status, frame };
    }

    /// Cancel a running conversion, or close a finished one. Returns
    /// whether anything changed.
    pub fn cancel_conversion(&mut self) -> bool {
        match &self.media {
            MediaPanel::Running(job) => {
                if job.is_cancel_requested() {
                    return false;
                }
                job.cancel();
                true
            }
            MediaPanel::Finished { .. } => {
                self.media = MediaPanel::Hidden;
                true
            }
            MediaPanel::Hidden => false,
        }
    }

    /// Cancel and join any running worker.
    pub fn shutdown(&mut self) {
        if let MediaPanel::Running(job) = std::mem::take(&mut self.media) {
            job.acknowledge();
        }
    }
}

/// Set `flag` to `on`, keeping `count` in step. Repeats are no-ops.
fn toggle(flag: &mut bool, count: &mut u32, on: bool) {
    if *flag == on {
        return;
    }
    *flag = on;
    *count = if on { count.saturating_add(1) } else { count.saturating_sub(1) };
}

fn fail_feed<T>(feed: &mut Feed<T>, status: &mut Option<StatusLine>, error: &FetchError) {
    log::warn!("fetch failed: {error}");
    feed.fail(error);
    *status = Some(StatusLine {
        text: format!("{error}. Press r to retry"),
        kind: StatusKind::Error,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Token;
    use crate::media::{frame_queue, ConvertOptions, JobId, MediaSource, PixelBuffer};
    use crate::screen::{Command, Draft};
    use std::time::Duration;

    fn post(id: &str) -> Post {
        Post {
            id: id.into(),
            author: "ada".into(),
            body: "hello".into(),
            created_at: SystemTime::UNIX_EPOCH,
            likes: 0,
            reposts: 0,
            comments: 0,
            liked_by_me: false,
            reposted_by_me: false,
            media: None,
            photo: None,
        }
    }

    fn conversation(id: &str) -> Conversation {
        Conversation {
            id: id.into(),
            peer: "bob".into(),
            last_message: "hi".into(),
            last_message_at: SystemTime::UNIX_EPOCH,
            unread: true,
        }
    }

    fn app() -> App {
        let session = SessionContext::new(Some(Token::new("t")), Some("me".into()));
        App::new(ScreenManager::new(8, session), SettingsView::default())
    }

    fn posts(epoch: u64, ids: &[&str], next: Option<&str>) -> FetchMessage {
        FetchMessage {
            epoch,
            outcome: FetchOutcome::Posts {
                screen: Screen::Timeline,
                append: false,
                result: Ok(Page::new(
                    ids.iter().map(|id| post(id)).collect(),
                    next.map(|n| Cursor(n.into())),
                )),
            },
        }
    }

    // ==================== Fetch results ====================

    #[test]
    fn test_fetch_fills_feed_and_item_count() {
        let mut app = app();
        app.apply_fetch(posts(0, &["a", "b"], None));
        assert_eq!(app.timeline().items().len(), 2);
        assert_eq!(app.timeline().status(), &LoadStatus::Ready);
        assert_eq!(app.manager().navigation().item_count(Screen::Timeline), 2);
    }

    #[test]
    fn test_stale_fetch_is_discarded() {
        let mut app = app();
        let stale_epoch = app.manager().epoch();
        app.manager_mut().apply(Command::NavigateTo(Screen::Discover)).unwrap();
        app.apply_fetch(posts(stale_epoch, &["a"], None));
        assert!(app.timeline().items().is_empty());
    }

    #[test]
    fn test_action_result_survives_screen_change() {
        let mut app = app();
        app.manager_mut().apply(Command::NavigateTo(Screen::Discover)).unwrap();
        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Opened(Ok("opened".into())),
        });
        assert_eq!(app.status().unwrap().text, "opened");
    }

    #[test]
    fn test_failure_offers_retry() {
        let mut app = app();
        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Posts {
                screen: Screen::Timeline,
                append: false,
                result: Err(FetchError::Network("down".into())),
            },
        });
        assert!(matches!(app.timeline().status(), LoadStatus::Failed(_)));
        let status = app.status().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.text, "network error: down. Press r to retry");
    }

    #[test]
    fn test_append_extends_feed() {
        let mut app = app();
        app.apply_fetch(posts(0, &["a"], Some("1")));
        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Posts {
                screen: Screen::Timeline,
                append: true,
                result: Ok(Page::last(vec![post("b")])),
            },
        });
        let ids: Vec<_> = app.timeline().items().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(app.timeline().next().is_none());
    }

    #[test]
    fn test_more_wanted_near_end() {
        let mut app = app();
        app.apply_fetch(posts(0, &["a", "b", "c", "d", "e", "f"], Some("6")));
        assert_eq!(app.more_wanted(), None);
        app.manager_mut().apply(Command::MoveFocus(3)).unwrap();
        assert_eq!(
            app.more_wanted(),
            Some(Request::Load {
                screen: Screen::Timeline,
                cursor: Some(Cursor("6".into())),
            })
        );
        let request = app.more_wanted().unwrap();
        app.begin(&request);
        assert_eq!(app.more_wanted(), None);
    }

    // ==================== Resolving effects ====================

    #[test]
    fn test_resolve_open_per_screen() {
        let mut app = app();
        app.apply_fetch(posts(0, &["a", "b"], None));
        assert_eq!(
            app.resolve_open(Selection { screen: Screen::Timeline, index: 1 }),
            Some(Request::Open(OpenTarget::Post(post("b"))))
        );
        assert_eq!(app.resolve_open(Selection { screen: Screen::Timeline, index: 9 }), None);
        assert_eq!(app.resolve_open(Selection { screen: Screen::Settings, index: 0 }), None);
    }

    #[test]
    fn test_submission_to_conversation() {
        let mut app = app();
        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Conversations(Ok(vec![conversation("c1"), conversation("c2")])),
        });
        let submission = Submission {
            draft: Draft::new("yo".into()),
            target: SubmitTarget::Message { conversation: 1 },
        };
        assert_eq!(
            app.resolve_submission(&submission),
            Some(Request::Submit(Outgoing::Message {
                conversation_id: "c2".into(),
                text: "yo".into(),
            }))
        );
    }

    #[test]
    fn test_thread_marks_conversation_read() {
        let mut app = app();
        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Conversations(Ok(vec![conversation("c1")])),
        });
        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Thread(Ok(Thread {
                conversation_id: "c1".into(),
                peer: "bob".into(),
                messages: Vec::new(),
            })),
        });
        assert!(app.thread().is_some());
        assert!(!app.conversations().items()[0].unread);
    }

    // ==================== Post actions ====================

    fn like_first(app: &App) -> Request {
        app.request_for(&Effect::PostAction(
            Selection { screen: Screen::Timeline, index: 0 },
            PostAction::ToggleLike,
        ))
        .unwrap()
    }

    #[test]
    fn test_like_is_optimistic() {
        let mut app = app();
        app.apply_fetch(posts(0, &["a"], None));
        let request = like_first(&app);
        assert_eq!(
            request,
            Request::Submit(Outgoing::Like { post_id: "a".into(), like: true })
        );
        app.begin(&request);
        let post = &app.timeline().items()[0];
        assert!(post.liked_by_me);
        assert_eq!(post.likes, 1);

        // the next press takes it back
        assert_eq!(
            like_first(&app),
            Request::Submit(Outgoing::Like { post_id: "a".into(), like: false })
        );
    }

    #[test]
    fn test_refused_repost_is_reverted() {
        let mut app = app();
        app.apply_fetch(posts(0, &["a"], None));
        let outgoing = Outgoing::Repost { post_id: "a".into(), repost: true };
        app.begin(&Request::Submit(outgoing.clone()));
        assert_eq!(app.timeline().items()[0].reposts, 1);

        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Submitted {
                outgoing,
                result: Err(FetchError::Network("down".into())),
            },
        });
        let post = &app.timeline().items()[0];
        assert!(!post.reposted_by_me);
        assert_eq!(post.reposts, 0);
        assert_eq!(app.status().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn test_post_action_outside_post_list() {
        let app = app();
        let effect = Effect::PostAction(
            Selection { screen: Screen::Messages, index: 0 },
            PostAction::Comments,
        );
        assert_eq!(app.request_for(&effect), None);
    }

    fn comment(id: &str, body: &str) -> Comment {
        Comment {
            id: id.into(),
            author: "bob".into(),
            body: body.into(),
            created_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_comments_panel_loads_and_takes_drafts() {
        let mut app = app();
        app.apply_fetch(posts(0, &["a", "b"], None));
        let request = app
            .request_for(&Effect::PostAction(
                Selection { screen: Screen::Timeline, index: 1 },
                PostAction::Comments,
            ))
            .unwrap();
        assert_eq!(request, Request::Comments { post_id: "b".into() });
        app.begin(&request);
        assert_eq!(app.comments().unwrap().status, LoadStatus::Loading);

        // results for another post are ignored
        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Comments { post_id: "a".into(), result: Ok(vec![comment("x", "no")]) },
        });
        assert!(app.comments().unwrap().comments.is_empty());

        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Comments { post_id: "b".into(), result: Ok(vec![comment("c1", "nice")]) },
        });
        let panel = app.comments().unwrap();
        assert_eq!(panel.status, LoadStatus::Ready);
        assert_eq!(panel.comments[0].body, "nice");

        let submission = Submission {
            draft: Draft::new("agreed".into()),
            target: SubmitTarget::Post,
        };
        let outgoing = Outgoing::Comment { post_id: "b".into(), text: "agreed".into() };
        assert_eq!(app.resolve_submission(&submission), Some(Request::Submit(outgoing.clone())));

        let follow_up = app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Submitted { outgoing, result: Ok("commented".into()) },
        });
        assert_eq!(follow_up, vec![Request::Comments { post_id: "b".into() }]);
        assert_eq!(app.timeline().items()[1].comments, 1);
        assert_eq!(app.comments().unwrap().post.comments, 1);

        assert!(app.close_comments());
        assert!(!app.close_comments());
    }

    #[test]
    fn test_screen_change_closes_comments() {
        let mut app = app();
        app.apply_fetch(posts(0, &["a"], None));
        app.begin(&Request::Comments { post_id: "a".into() });
        assert!(app.comments().is_some());
        app.manager_mut().apply(Command::NavigateTo(Screen::Discover)).unwrap();
        app.on_screen_change();
        assert!(app.comments().is_none());
    }

    #[test]
    fn test_opening_notification_marks_it_read() {
        let mut app = app();
        let n = Notification {
            id: "n1".into(),
            kind: crate::backend::NotificationKind::Like,
            actor: "bob".into(),
            preview: "hello".into(),
            created_at: SystemTime::UNIX_EPOCH,
            read: false,
        };
        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Notifications { append: false, result: Ok(Page::last(vec![n])) },
        });
        let request = app
            .resolve_open(Selection { screen: Screen::Notifications, index: 0 })
            .unwrap();
        app.begin(&request);
        assert!(app.notifications().items()[0].read);
    }

    #[test]
    fn test_photo_rides_along_with_next_post() {
        let mut app = app();
        let photo = Arc::new(Frame::filled(3, 2, crate::ascii::GlyphMapper::default().blank()));
        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Photo(Ok(Arc::clone(&photo))),
        });
        assert_eq!(app.status().unwrap().text, "photo attached (3x2)");
        assert!(app.pending_photo().is_some());

        let submission = Submission {
            draft: Draft::new("look".into()),
            target: SubmitTarget::Post,
        };
        let outgoing = Outgoing::Post { text: "look".into(), photo: Some(photo) };
        assert_eq!(app.resolve_submission(&submission), Some(Request::Submit(outgoing.clone())));

        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Submitted { outgoing, result: Ok("posted".into()) },
        });
        assert!(app.pending_photo().is_none());
    }

    #[test]
    fn test_failed_photo_keeps_previous() {
        let mut app = app();
        app.apply_fetch(FetchMessage {
            epoch: 0,
            outcome: FetchOutcome::Photo(Err("cat.txt: unsupported format".into())),
        });
        assert!(app.pending_photo().is_none());
        assert_eq!(app.status().unwrap().kind, StatusKind::Error);
    }

    // ==================== Media panel ====================

    #[test]
    fn test_conversion_lifecycle() {
        let mut app = app();
        let (tx, mut rx) = frame_queue(8);
        let job = ConversionJob::spawn(
            JobId(1),
            MediaSource::pixels(PixelBuffer::gray(8, 8, 255)),
            ConvertOptions::new(4, 2),
            tx,
        );
        app.start_conversion(job);
        assert!(matches!(app.media(), MediaPanel::Running(_)));

        while let Some(event) = rx.blocking_recv() {
            let done = matches!(event, JobEvent::Finished { .. });
            app.observe(&event);
            if done {
                break;
            }
        }
        match app.media() {
            MediaPanel::Finished { status, frame, .. } => {
                assert!(matches!(status, JobStatus::Done(_)));
                assert!(frame.is_some());
            }
            other => panic!("unexpected panel {other:?}"),
        }
        assert!(app.cancel_conversion());
        assert!(matches!(app.media(), MediaPanel::Hidden));
        assert!(!app.cancel_conversion());
    }

    #[test]
    fn test_cancel_running_conversion() {
        let mut app = app();
        let (tx, mut rx) = frame_queue(2);
        let frames = vec![PixelBuffer::gray(4, 4, 10); 200];
        let job = ConversionJob::spawn(
            JobId(2),
            MediaSource::sequence(frames, Duration::from_millis(20)),
            ConvertOptions::new(2, 1),
            tx,
        );
        app.start_conversion(job);
        assert!(app.cancel_conversion());
        assert!(!app.cancel_conversion());
        while let Some(event) = rx.blocking_recv() {
            let done = matches!(event, JobEvent::Finished { .. });
            app.observe(&event);
            if done {
                break;
            }
        }
        assert!(matches!(
            app.media(),
            MediaPanel::Finished {
                status: JobStatus::Cancelled,
                ..
            }
        ));
    }
}
