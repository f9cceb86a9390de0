//! Composites [`App`] into a grid: header, tab bar, content, status, footer.

use std::rc::Rc;

use ratatui::layout::{Constraint, Layout, Rect};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, CommentPanel, LoadStatus, MediaPanel, StatusKind};
use crate::ascii::{Frame, Rgb};
use crate::backend::format_time_ago;
use crate::input::Mode;
use crate::media::JobStatus;
use crate::screen::Screen;

use super::diff::{Dims, View};
use super::grid::{Grid, Style};

const ACCENT: Rgb = Rgb::new(90, 170, 255);
const MUTED: Rgb = Rgb::new(140, 140, 140);
const ERROR: Rgb = Rgb::new(230, 80, 80);
const HIGHLIGHT: Rgb = Rgb::new(255, 200, 80);

/// Rows a post takes in a list: meta line, body, spacer.
const POST_ROWS: u16 = 3;

/// Placeholder drawn while a conversion has no frame yet.
const PLACEHOLDER: [&str; 2] = [". : . : ", " : . : ."];

/// The screen regions for a terminal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub header: Rect,
    pub tabs: Rect,
    pub content: Rect,
    pub status: Rect,
    pub footer: Rect,
}

impl Regions {
    pub fn new(dims: Dims) -> Self {
        let chunks: Rc<[Rect]> = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(Rect::new(0, 0, dims.width, dims.height));
        Self {
            header: chunks[0],
            tabs: chunks[1],
            content: chunks[2],
            status: chunks[3],
            footer: chunks[4],
        }
    }
}

/// Rows per list item on a screen.
pub fn rows_per_item(screen: Screen) -> u16 {
    match screen {
        Screen::Timeline | Screen::Discover => POST_ROWS,
        Screen::Messages | Screen::Notifications | Screen::Settings => 1,
    }
}

/// How many items of the active screen fit in the content area.
pub fn page_size(dims: Dims, screen: Screen) -> usize {
    let rows = Regions::new(dims).content.height / rows_per_item(screen);
    usize::from(rows.max(1))
}

impl View for App {
    fn draw(&self, grid: &mut Grid) {
        let dims = Dims::new(grid.width(), grid.height());
        let regions = Regions::new(dims);

        draw_header(self, grid, regions.header);
        draw_tabs(self, grid, regions.tabs);
        if self.manager().shows_login_placeholder() && self.active().has_feed() {
            draw_login(grid, regions.content);
        } else if !matches!(self.media(), MediaPanel::Hidden) {
            draw_media(self.media(), grid, regions.content);
        } else if let Some(panel) = self.comments() {
            draw_comments(self, panel, grid, regions.content);
        } else {
            match self.active() {
                Screen::Timeline | Screen::Discover => draw_posts(self, grid, regions.content),
                Screen::Messages => draw_messages(self, grid, regions.content),
                Screen::Notifications => draw_notifications(self, grid, regions.content),
                Screen::Settings => draw_settings(self, grid, regions.content),
            }
        }
        draw_status(self, grid, regions.status);
        draw_footer(self, grid, regions.footer);
    }
}

fn draw_header(app: &App, grid: &mut Grid, area: Rect) {
    grid.fill(area, ' ', Style::PLAIN.reverse());
    let title = " tuitter";
    let n = grid.put_line(area, 0, title, Style::fg(ACCENT).bold().reverse());
    let who = format!("@{} ", app.session().handle_or_default());
    let x = area.width.saturating_sub(who.width() as u16);
    if x > n {
        grid.put_str(area.x + x, area.y, &who, Style::PLAIN.reverse(), area.width - x);
    }
}

fn draw_tabs(app: &App, grid: &mut Grid, area: Rect) {
    let mut x = area.x + 1;
    for screen in Screen::ALL {
        let label = format!(" {} {} ", screen.digit(), screen.title());
        let style = if screen == app.active() {
            Style::fg(HIGHLIGHT).bold().reverse()
        } else {
            Style::fg(MUTED)
        };
        let room = (area.x + area.width).saturating_sub(x);
        x += grid.put_str(x, area.y, &label, style, room) + 1;
    }
}

fn draw_login(grid: &mut Grid, area: Rect) {
    let lines = [
        "Sign in required.",
        "",
        "Set TUITTER_TOKEN, or start with --demo to browse sample content.",
        "Number keys still switch screens; q quits.",
    ];
    let top = area.height.saturating_sub(lines.len() as u16) / 2;
    for (i, line) in lines.iter().enumerate() {
        let style = if i == 0 { Style::PLAIN.bold() } else { Style::fg(MUTED) };
        grid.put_line(area, top + i as u16, &format!("  {line}"), style);
    }
}

/// First visible item so the focused one is on screen. Scrolls a page at
/// a time, so the view depends only on the focus.
fn scroll_offset(focus: usize, visible: usize) -> usize {
    let visible = visible.max(1);
    (focus / visible) * visible
}

/// Message for an empty or failed list, or `None` when items should show.
fn list_notice(status: &LoadStatus, empty: bool) -> Option<(String, Style)> {
    match status {
        LoadStatus::Failed(reason) => Some((format!("{reason}. Press r to retry"), Style::fg(ERROR))),
        LoadStatus::Loading if empty => Some(("Loading...".to_string(), Style::fg(MUTED))),
        LoadStatus::Idle if empty => Some(("Nothing loaded yet. Press r to refresh".to_string(), Style::fg(MUTED))),
        _ if empty => Some(("Nothing here yet".to_string(), Style::fg(MUTED))),
        _ => None,
    }
}

fn draw_posts(app: &App, grid: &mut Grid, area: Rect) {
    let screen = app.active();
    let feed = if screen == Screen::Discover { app.discover() } else { app.timeline() };
    if let Some((text, style)) = list_notice(feed.status(), feed.items().is_empty()) {
        grid.put_line(area, 0, &format!("  {text}"), style);
        return;
    }

    let focus = app.manager().navigation().focus(screen);
    let visible = usize::from((area.height / POST_ROWS).max(1));
    let first = scroll_offset(focus, visible);
    for (slot, (index, post)) in feed.items().iter().enumerate().skip(first).take(visible).enumerate() {
        let row = slot as u16 * POST_ROWS;
        let focused = index == focus;
        let marker = if focused { ">" } else { " " };
        let liked = if post.liked_by_me { "*" } else { "" };
        let reposted = if post.reposted_by_me { "*" } else { "" };
        let media = if post.media.is_some() { "  [media]" } else { "" };
        let photo = if post.photo.is_some() { "  [photo]" } else { "" };
        let meta = format!(
            "{marker} @{}  {}  likes {}{liked}  reposts {}{reposted}  replies {}{media}{photo}",
            post.author,
            format_time_ago(app.now(), post.created_at),
            post.likes,
            post.reposts,
            post.comments,
        );
        let meta_style = if focused { Style::fg(ACCENT).bold() } else { Style::fg(ACCENT) };
        grid.put_line(area, row, &meta, meta_style);
        let body_style = if focused { Style::PLAIN.bold() } else { Style::PLAIN };
        grid.put_line(area, row + 1, &format!("  {}", post.body), body_style);
    }
}

/// The post on top, its photo if any, then as many of the latest
/// comments as fit.
fn draw_comments(app: &App, panel: &CommentPanel, grid: &mut Grid, area: Rect) {
    let post = &panel.post;
    let meta = format!(
        " @{}  {}  likes {}  reposts {}  replies {}",
        post.author,
        format_time_ago(app.now(), post.created_at),
        post.likes,
        post.reposts,
        post.comments,
    );
    grid.put_line(area, 0, &meta, Style::fg(ACCENT).bold());
    grid.put_line(area, 1, &format!("  {}", post.body), Style::PLAIN.bold());

    let mut row = 2;
    if let Some(photo) = &post.photo {
        // keep a few rows for the comments under a tall photo
        let rows = photo.height().min(area.height.saturating_sub(row + 3));
        let clip = Rect::new(area.x + 2, area.y + row, area.width.saturating_sub(2), rows);
        grid.blit_frame(photo, clip.x, clip.y, clip);
        row += rows;
    }
    grid.put_line(area, row, " - Comments (i replies, Esc closes) -", Style::fg(MUTED));
    row += 1;

    let notice = match &panel.status {
        LoadStatus::Failed(reason) => Some((reason.clone(), Style::fg(ERROR))),
        LoadStatus::Loading | LoadStatus::Idle if panel.comments.is_empty() => {
            Some(("Loading...".to_string(), Style::fg(MUTED)))
        }
        _ if panel.comments.is_empty() => Some(("No comments yet".to_string(), Style::fg(MUTED))),
        _ => None,
    };
    if let Some((text, style)) = notice {
        grid.put_line(area, row, &format!("  {text}"), style);
        return;
    }

    let room = usize::from(area.height.saturating_sub(row));
    let skip = panel.comments.len().saturating_sub(room);
    for (i, c) in panel.comments.iter().skip(skip).enumerate() {
        let line = format!(
            "  @{} {}: {}",
            c.author,
            format_time_ago(app.now(), c.created_at),
            c.body
        );
        let style = if c.author == app.session().handle_or_default() {
            Style::fg(HIGHLIGHT)
        } else {
            Style::PLAIN
        };
        grid.put_line(area, row + i as u16, &line, style);
    }
}

fn draw_messages(app: &App, grid: &mut Grid, area: Rect) {
    let conversations = app.conversations();
    if let Some((text, style)) = list_notice(conversations.status(), conversations.items().is_empty()) {
        grid.put_line(area, 0, &format!("  {text}"), style);
        return;
    }

    let chunks = Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).split(area);
    let (list, detail) = (chunks[0], chunks[1]);

    let focus = app.manager().navigation().focus(Screen::Messages);
    let visible = usize::from(list.height.max(1));
    let first = scroll_offset(focus, visible);
    for (slot, (index, c)) in conversations.items().iter().enumerate().skip(first).take(visible).enumerate() {
        let unread = if c.unread { "*" } else { " " };
        let line = format!("{unread}@{}: {}", c.peer, c.last_message);
        let style = if index == focus { Style::PLAIN.reverse() } else { Style::PLAIN };
        grid.put_line(list, slot as u16, &line, style);
    }

    let Some(thread) = app.thread() else {
        grid.put_line(detail, 0, " Enter opens the conversation, i replies", Style::fg(MUTED));
        return;
    };
    grid.put_line(detail, 0, &format!(" @{}", thread.peer), Style::fg(ACCENT).bold());
    let room = usize::from(detail.height.saturating_sub(1));
    let skip = thread.messages.len().saturating_sub(room);
    for (i, m) in thread.messages.iter().skip(skip).enumerate() {
        let line = format!(" {} {}: {}", format_time_ago(app.now(), m.sent_at), m.sender, m.body);
        let style = if m.sender == "me" { Style::fg(HIGHLIGHT) } else { Style::PLAIN };
        grid.put_line(detail, i as u16 + 1, &line, style);
    }
}

fn draw_notifications(app: &App, grid: &mut Grid, area: Rect) {
    let feed = app.notifications();
    if let Some((text, style)) = list_notice(feed.status(), feed.items().is_empty()) {
        grid.put_line(area, 0, &format!("  {text}"), style);
        return;
    }
    let focus = app.manager().navigation().focus(Screen::Notifications);
    let visible = usize::from(area.height.max(1));
    let first = scroll_offset(focus, visible);
    for (slot, (index, n)) in feed.items().iter().enumerate().skip(first).take(visible).enumerate() {
        let dot = if n.read { " " } else { "*" };
        let line = format!(
            "{dot}@{} {}  {}  {}",
            n.actor,
            n.kind.verb(),
            format_time_ago(app.now(), n.created_at),
            n.preview
        );
        let mut style = if n.read { Style::fg(MUTED) } else { Style::PLAIN };
        if index == focus {
            style = style.reverse();
        }
        grid.put_line(area, slot as u16, &line, style);
    }
}

fn draw_settings(app: &App, grid: &mut Grid, area: Rect) {
    let settings = app.settings();
    let avatar_width = settings.avatar.as_ref().map_or(0, |a| a.width() + 2);
    let text_area = Rect::new(area.x, area.y, area.width.saturating_sub(avatar_width), area.height);

    grid.put_line(text_area, 0, "  Settings", Style::PLAIN.bold());
    let key_width = settings.entries.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    for (i, (key, value)) in settings.entries.iter().enumerate() {
        let line = format!("  {key:<key_width$}  {value}");
        grid.put_line(text_area, i as u16 + 2, &line, Style::PLAIN);
    }

    if let Some(avatar) = &settings.avatar {
        let x = area.x + area.width.saturating_sub(avatar.width() + 1);
        grid.blit_frame(avatar, x, area.y + 1, area);
    }
}

fn draw_media(panel: &MediaPanel, grid: &mut Grid, area: Rect) {
    let (title, frame, failure) = match panel {
        MediaPanel::Hidden => return,
        MediaPanel::Running(job) => {
            let state = if job.is_cancel_requested() { "cancelling" } else { job.status().label() };
            (format!(" {} ({state}, Esc cancels)", job.source()), job.latest_frame().cloned(), None)
        }
        MediaPanel::Finished { source, status, frame } => {
            let failure = match status {
                JobStatus::Failed(reason) => Some(reason.clone()),
                _ => None,
            };
            (format!(" {source} ({}, Esc closes)", status.label()), frame.clone(), failure)
        }
    };

    grid.put_line(area, 0, &title, Style::fg(MUTED));
    let body = Rect::new(area.x, area.y + 1, area.width, area.height.saturating_sub(1));

    if let Some(reason) = failure {
        draw_banner(grid, body, &reason);
        return;
    }
    match frame {
        Some(frame) => draw_frame_centered(grid, body, &frame),
        None => draw_placeholder(grid, body),
    }
}

fn draw_frame_centered(grid: &mut Grid, area: Rect, frame: &Frame) {
    let x = area.x + area.width.saturating_sub(frame.width()) / 2;
    let y = area.y + area.height.saturating_sub(frame.height()) / 2;
    grid.blit_frame(frame, x, y, area);
}

fn draw_placeholder(grid: &mut Grid, area: Rect) {
    for row in 0..area.height {
        let pattern = PLACEHOLDER[usize::from(row) % PLACEHOLDER.len()];
        let line: String = pattern.chars().cycle().take(usize::from(area.width)).collect();
        grid.put_line(area, row, &line, Style::fg(MUTED).dim());
    }
}

fn draw_banner(grid: &mut Grid, area: Rect, reason: &str) {
    if area.height == 0 {
        return;
    }
    let row = area.height / 2;
    let banner = Rect::new(area.x, area.y + row, area.width, 1);
    grid.fill(banner, ' ', Style::fg(ERROR).reverse());
    grid.put_line(banner, 0, &format!(" conversion failed: {reason}"), Style::fg(ERROR).reverse().bold());
}

fn draw_status(app: &App, grid: &mut Grid, area: Rect) {
    let Some(status) = app.status() else {
        return;
    };
    let style = match status.kind {
        StatusKind::Info => Style::fg(ACCENT),
        StatusKind::Error => Style::fg(ERROR).bold(),
    };
    grid.put_line(area, 0, &format!(" {}", status.text), style);
}

fn draw_footer(app: &App, grid: &mut Grid, area: Rect) {
    let (line, style) = match app.mode() {
        Mode::Compose => {
            let target = if app.active() == Screen::Messages {
                "message".to_string()
            } else if app.comments().is_some() {
                "comment".to_string()
            } else {
                match app.pending_photo() {
                    Some(photo) => format!("post [photo {}x{}]", photo.width(), photo.height()),
                    None => "post".to_string(),
                }
            };
            (format!(" {target}> {}_", app.input()), Style::PLAIN.bold())
        }
        Mode::CommandLine => (format!(":{}_", app.input()), Style::PLAIN.bold()),
        Mode::Normal => (
            " 1-5 screens  j/k move  enter open  i compose  l like  t repost  c comments  : command  q quit".to_string(),
            Style::fg(MUTED),
        ),
    };
    grid.put_line(area, 0, &line, style);
}
