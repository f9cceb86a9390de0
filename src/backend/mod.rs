//! Collaborators the core talks to: data fetching, content actions, tokens.
//!
//! The wire protocol lives behind these traits. The UI only ever sees the
//! already-fetched values in [`model`], delivered back to the event loop.

mod demo;
mod model;
mod session;

use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::ascii::Frame;

pub use demo::DemoBackend;
pub use model::{
    format_time_ago, Comment, Conversation, Cursor, Message, Notification, NotificationKind, Page, Post,
    Thread,
};
pub use session::{EnvTokenStore, MemoryTokenStore, SessionContext, Token, TokenStore, TOKEN_ENV};

/// Failures reported by a fetcher. Retrying is the fetcher's business; the
/// UI only offers a manual refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("not signed in")]
    Unauthorized,

    #[error("network error: {0}")]
    Network(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited, try again shortly")]
    RateLimited,

    #[error("{0}")]
    Other(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Read side of the backend. Futures own everything they need so they can
/// run as detached tasks.
pub trait DataFetcher: Send + Sync {
    fn fetch_timeline_page(
        &self,
        ctx: &SessionContext,
        cursor: Option<Cursor>,
    ) -> BoxFuture<'static, FetchResult<Page<Post>>>;

    fn fetch_discover_page(
        &self,
        ctx: &SessionContext,
        cursor: Option<Cursor>,
    ) -> BoxFuture<'static, FetchResult<Page<Post>>>;

    fn fetch_conversations(&self, ctx: &SessionContext) -> BoxFuture<'static, FetchResult<Vec<Conversation>>>;

    fn fetch_thread(&self, ctx: &SessionContext, conversation_id: &str) -> BoxFuture<'static, FetchResult<Thread>>;

    fn fetch_notifications(
        &self,
        ctx: &SessionContext,
        cursor: Option<Cursor>,
    ) -> BoxFuture<'static, FetchResult<Page<Notification>>>;

    /// Comments under a post, oldest first.
    fn fetch_comments(&self, ctx: &SessionContext, post_id: &str) -> BoxFuture<'static, FetchResult<Vec<Comment>>>;
}

/// What a selection resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenTarget {
    Post(Post),
    Notification(Notification),
}

/// Content leaving the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Post { text: String, photo: Option<Arc<Frame>> },
    Message { conversation_id: String, text: String },
    Comment { post_id: String, text: String },
    /// Like when `like` is set, otherwise take the like back.
    Like { post_id: String, like: bool },
    Repost { post_id: String, repost: bool },
}

/// Write side of the backend. Results are short status lines for the UI.
pub trait ContentActions: Send + Sync {
    fn open(&self, ctx: &SessionContext, target: OpenTarget) -> BoxFuture<'static, FetchResult<String>>;

    fn submit(&self, ctx: &SessionContext, outgoing: Outgoing) -> BoxFuture<'static, FetchResult<String>>;
}
