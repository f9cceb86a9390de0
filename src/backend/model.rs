//! Feed data as the UI consumes it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::ascii::Frame;

/// Opaque continuation token for paged feeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(pub String);

/// One page of a feed plus where to continue.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<Cursor>) -> Self {
        Self { items, next }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: SystemTime,
    pub likes: u32,
    pub reposts: u32,
    pub comments: u32,
    pub liked_by_me: bool,
    pub reposted_by_me: bool,
    /// Attached picture or clip, shown converted to text when opened.
    pub media: Option<PathBuf>,
    /// Photo attached already converted to text.
    pub photo: Option<Arc<Frame>>,
}

/// A reply under a post.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: SystemTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub peer: String,
    pub last_message: String,
    pub last_message_at: SystemTime,
    pub unread: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub body: String,
    pub sent_at: SystemTime,
}

/// All messages of one conversation, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub conversation_id: String,
    pub peer: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Like,
    Repost,
    Mention,
    Follow,
    Reply,
}

impl NotificationKind {
    pub fn verb(self) -> &'static str {
        match self {
            NotificationKind::Like => "liked your post",
            NotificationKind::Repost => "reposted your post",
            NotificationKind::Mention => "mentioned you",
            NotificationKind::Follow => "followed you",
            NotificationKind::Reply => "replied to you",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub actor: String,
    pub preview: String,
    pub created_at: SystemTime,
    pub read: bool,
}

/// Short relative age: `just now`, `42s ago`, `5m ago`, `3h ago`, `2d ago`.
/// Timestamps in the future count as just now.
pub fn format_time_ago(now: SystemTime, then: SystemTime) -> String {
    let secs = now
        .duration_since(then)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    if secs < 10 {
        return "just now".to_string();
    }
    if secs < 60 {
        return format!("{secs}s ago");
    }
    let minutes = secs / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}
