//! In-memory backend used by `tuitter --demo` and the tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::{
    Comment, Conversation, ContentActions, Cursor, DataFetcher, FetchError, FetchResult, Message,
    Notification, NotificationKind, OpenTarget, Outgoing, Page, Post, SessionContext, Thread,
};

const PAGE_SIZE: usize = 20;

const AUTHORS: &[&str] = &["ada", "grace", "linus", "ken", "barbara", "dennis", "margaret", "alan"];

const BODIES: &[&str] = &[
    "shipping a terminal client today, wish me luck",
    "hot take: modal editors are a lifestyle",
    "rewrote the parser again. it is faster and i am tired",
    "anyone else render cat pictures as ascii at 3am",
    "coffee count: 4. bugs fixed: 1. bugs found: 6",
    "reminder that the 80 column limit is a suggestion",
    "new blog post on error diffusion dithering",
    "keyboard-only week, day 3: the mouse misses me",
];

#[derive(Debug)]
struct DemoData {
    timeline: Vec<Post>,
    discover: Vec<Post>,
    conversations: Vec<Conversation>,
    threads: Vec<Thread>,
    notifications: Vec<Notification>,
    /// Filled in per post the first time its comments are read.
    comments: HashMap<String, Vec<Comment>>,
    next_id: u64,
}

impl DemoData {
    fn post_mut(&mut self, id: &str) -> FetchResult<&mut Post> {
        self.timeline
            .iter_mut()
            .chain(self.discover.iter_mut())
            .find(|p| p.id == id)
            .ok_or_else(|| FetchError::NotFound(format!("post {id}")))
    }

    /// Comments of a post, generating its initial ones on first access.
    fn comments_mut(&mut self, post_id: &str) -> FetchResult<&mut Vec<Comment>> {
        let post = self.post_mut(post_id)?;
        let (count, created_at) = (post.comments as usize, post.created_at);
        Ok(self.comments.entry(post_id.to_string()).or_insert_with(|| {
            (0..count)
                .map(|i| Comment {
                    id: format!("{post_id}c{i}"),
                    author: AUTHORS[(i * 5 + post_id.len()) % AUTHORS.len()].to_string(),
                    body: BODIES[(i * 7 + 2) % BODIES.len()].to_string(),
                    created_at: created_at + Duration::from_secs(60 * (i as u64 + 1)),
                })
                .collect()
        }))
    }
}

/// A self-contained backend with generated content.
///
/// Cheap to clone; clones share data, so posts and messages submitted
/// through [`ContentActions`] show up in later fetches.
#[derive(Debug, Clone)]
pub struct DemoBackend {
    data: Arc<Mutex<DemoData>>,
    failure: Arc<Mutex<Option<FetchError>>>,
    latency: Duration,
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoBackend {
    pub fn new() -> Self {
        Self::generate(SystemTime::now(), 45)
    }

    /// Generate `posts` timeline posts stamped relative to `now`.
    pub fn generate(now: SystemTime, posts: usize) -> Self {
        let ago = |mins: u64| now.checked_sub(Duration::from_secs(mins * 60)).unwrap_or(now);
        let post = |i: usize, prefix: &str| Post {
            id: format!("{prefix}{i}"),
            author: AUTHORS[i % AUTHORS.len()].to_string(),
            body: BODIES[(i * 3 + prefix.len()) % BODIES.len()].to_string(),
            created_at: ago(i as u64 * 7 + 1),
            likes: ((i * 37) % 120) as u32,
            reposts: ((i * 11) % 30) as u32,
            comments: ((i * 5) % 12) as u32,
            liked_by_me: i % 4 == 0,
            reposted_by_me: i % 9 == 0,
            media: None,
            photo: None,
        };

        let timeline = (0..posts).map(|i| post(i, "t")).collect();
        let discover = (0..posts / 2).map(|i| post(i, "d")).collect();

        let mut conversations = Vec::new();
        let mut threads = Vec::new();
        for (i, peer) in AUTHORS.iter().take(5).enumerate() {
            let id = format!("c{i}");
            let messages: Vec<Message> = (0..4)
                .map(|m| Message {
                    id: format!("{id}m{m}"),
                    sender: if m % 2 == 0 { peer.to_string() } else { "me".to_string() },
                    body: BODIES[(i + m) % BODIES.len()].to_string(),
                    sent_at: ago(((4 - m) * 13 + i * 60) as u64),
                })
                .collect();
            let last = messages.last().cloned();
            conversations.push(Conversation {
                id: id.clone(),
                peer: peer.to_string(),
                last_message: last.as_ref().map(|m| m.body.clone()).unwrap_or_default(),
                last_message_at: last.map(|m| m.sent_at).unwrap_or(now),
                unread: i < 2,
            });
            threads.push(Thread {
                conversation_id: id,
                peer: peer.to_string(),
                messages,
            });
        }

        let kinds = [
            NotificationKind::Like,
            NotificationKind::Follow,
            NotificationKind::Repost,
            NotificationKind::Mention,
            NotificationKind::Reply,
        ];
        let notifications = (0..12)
            .map(|i| Notification {
                id: format!("n{i}"),
                kind: kinds[i % kinds.len()],
                actor: AUTHORS[(i * 3) % AUTHORS.len()].to_string(),
                preview: BODIES[i % BODIES.len()].to_string(),
                created_at: ago(i as u64 * 17 + 2),
                read: i > 3,
            })
            .collect();

        Self {
            data: Arc::new(Mutex::new(DemoData {
                timeline,
                discover,
                conversations,
                threads,
                notifications,
                comments: HashMap::new(),
                next_id: 1,
            })),
            failure: Arc::new(Mutex::new(None)),
            latency: Duration::ZERO,
        }
    }

    /// Delay every request, to exercise loading states.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Attach a media file to the first timeline post.
    pub fn with_media(self, path: impl Into<PathBuf>) -> Self {
        if let Some(post) = self.lock().timeline.first_mut() {
            post.media = Some(path.into());
        }
        self
    }

    /// Make the next request fail with `error`.
    pub fn fail_next(&self, error: FetchError) {
        if let Ok(mut slot) = self.failure.lock() {
            *slot = Some(error);
        }
    }

    fn lock(&self) -> MutexGuard<'_, DemoData> {
        // a panic while holding the lock leaves the data consistent enough
        match self.data.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn take_failure(&self) -> Option<FetchError> {
        self.failure.lock().ok().and_then(|mut f| f.take())
    }

    /// Run `f` against the data after the simulated latency.
    fn respond<T, F>(&self, ctx: &SessionContext, f: F) -> BoxFuture<'static, FetchResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&mut DemoData) -> FetchResult<T> + Send + 'static,
    {
        let authenticated = ctx.is_authenticated();
        let failure = self.take_failure();
        let latency = self.latency;
        let this = self.clone();
        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if let Some(error) = failure {
                return Err(error);
            }
            if !authenticated {
                return Err(FetchError::Unauthorized);
            }
            let mut data = this.lock();
            f(&mut data)
        }
        .boxed()
    }
}

fn paginate<T: Clone>(items: &[T], cursor: Option<Cursor>) -> FetchResult<Page<T>> {
    let start = match cursor {
        Some(Cursor(c)) => c
            .parse::<usize>()
            .map_err(|_| FetchError::Other(format!("bad cursor {c}")))?,
        None => 0,
    };
    let end = (start + PAGE_SIZE).min(items.len());
    let page = items.get(start..end).map(<[T]>::to_vec).unwrap_or_default();
    let next = (end < items.len()).then(|| Cursor(end.to_string()));
    Ok(Page::new(page, next))
}

impl DataFetcher for DemoBackend {
    fn fetch_timeline_page(
        &self,
        ctx: &SessionContext,
        cursor: Option<Cursor>,
    ) -> BoxFuture<'static, FetchResult<Page<Post>>> {
        self.respond(ctx, move |d| paginate(&d.timeline, cursor))
    }

    fn fetch_discover_page(
        &self,
        ctx: &SessionContext,
        cursor: Option<Cursor>,
    ) -> BoxFuture<'static, FetchResult<Page<Post>>> {
        self.respond(ctx, move |d| paginate(&d.discover, cursor))
    }

    fn fetch_conversations(&self, ctx: &SessionContext) -> BoxFuture<'static, FetchResult<Vec<Conversation>>> {
        self.respond(ctx, |d| Ok(d.conversations.clone()))
    }

    fn fetch_thread(&self, ctx: &SessionContext, conversation_id: &str) -> BoxFuture<'static, FetchResult<Thread>> {
        let id = conversation_id.to_string();
        self.respond(ctx, move |d| {
            if let Some(c) = d.conversations.iter_mut().find(|c| c.id == id) {
                c.unread = false;
            }
            d.threads
                .iter()
                .find(|t| t.conversation_id == id)
                .cloned()
                .ok_or(FetchError::NotFound(id))
        })
    }

    fn fetch_notifications(
        &self,
        ctx: &SessionContext,
        cursor: Option<Cursor>,
    ) -> BoxFuture<'static, FetchResult<Page<Notification>>> {
        self.respond(ctx, move |d| paginate(&d.notifications, cursor))
    }

    fn fetch_comments(&self, ctx: &SessionContext, post_id: &str) -> BoxFuture<'static, FetchResult<Vec<Comment>>> {
        let id = post_id.to_string();
        self.respond(ctx, move |d| d.comments_mut(&id).map(|c| c.clone()))
    }
}

impl ContentActions for DemoBackend {
    fn open(&self, ctx: &SessionContext, target: OpenTarget) -> BoxFuture<'static, FetchResult<String>> {
        self.respond(ctx, move |d| match target {
            OpenTarget::Post(post) => Ok(format!(
                "@{}: {} ({} likes, {} comments)",
                post.author, post.body, post.likes, post.comments
            )),
            OpenTarget::Notification(n) => {
                if let Some(stored) = d.notifications.iter_mut().find(|s| s.id == n.id) {
                    stored.read = true;
                }
                Ok(format!("@{} {}", n.actor, n.kind.verb()))
            }
        })
    }

    fn submit(&self, ctx: &SessionContext, outgoing: Outgoing) -> BoxFuture<'static, FetchResult<String>> {
        let me = ctx.handle_or_default().to_string();
        self.respond(ctx, move |d| {
            let id = d.next_id;
            d.next_id += 1;
            let now = SystemTime::now();
            match outgoing {
                Outgoing::Post { text, photo } => {
                    d.timeline.insert(
                        0,
                        Post {
                            id: format!("new{id}"),
                            author: me,
                            body: text,
                            created_at: now,
                            likes: 0,
                            reposts: 0,
                            comments: 0,
                            liked_by_me: false,
                            reposted_by_me: false,
                            media: None,
                            photo,
                        },
                    );
                    Ok("posted".to_string())
                }
                Outgoing::Comment { post_id, text } => {
                    d.comments_mut(&post_id)?.push(Comment {
                        id: format!("new{id}"),
                        author: me,
                        body: text,
                        created_at: now,
                    });
                    let post = d.post_mut(&post_id)?;
                    post.comments += 1;
                    Ok(format!("commented on @{}'s post", post.author))
                }
                Outgoing::Like { post_id, like } => {
                    let post = d.post_mut(&post_id)?;
                    if post.liked_by_me != like {
                        post.liked_by_me = like;
                        post.likes = if like { post.likes + 1 } else { post.likes.saturating_sub(1) };
                    }
                    Ok(if like { "liked" } else { "unliked" }.to_string())
                }
                Outgoing::Repost { post_id, repost } => {
                    let post = d.post_mut(&post_id)?;
                    if post.reposted_by_me != repost {
                        post.reposted_by_me = repost;
                        post.reposts = if repost { post.reposts + 1 } else { post.reposts.saturating_sub(1) };
                    }
                    Ok(if repost { "reposted" } else { "repost removed" }.to_string())
                }
                Outgoing::Message {
                    conversation_id,
                    text,
                } => {
                    let thread = d
                        .threads
                        .iter_mut()
                        .find(|t| t.conversation_id == conversation_id)
                        .ok_or_else(|| FetchError::NotFound(conversation_id.clone()))?;
                    thread.messages.push(Message {
                        id: format!("new{id}"),
                        sender: "me".to_string(),
                        body: text.clone(),
                        sent_at: now,
                    });
                    let peer = thread.peer.clone();
                    if let Some(c) = d.conversations.iter_mut().find(|c| c.id == conversation_id) {
                        c.last_message = text;
                        c.last_message_at = now;
                    }
                    Ok(format!("sent to @{peer}"))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Token;

    fn ctx() -> SessionContext {
        SessionContext::new(Some(Token::new("demo")), Some("me".into()))
    }

    #[tokio::test]
    async fn test_timeline_pages() {
        let backend = DemoBackend::generate(SystemTime::now(), 45);
        let first = backend.fetch_timeline_page(&ctx(), None).await.unwrap();
        assert_eq!(first.items.len(), PAGE_SIZE);
        let second = backend
            .fetch_timeline_page(&ctx(), first.next.clone())
            .await
            .unwrap();
        assert_eq!(second.items[0].id, "t20");
        let third = backend.fetch_timeline_page(&ctx(), second.next).await.unwrap();
        assert_eq!(third.items.len(), 5);
        assert!(third.next.is_none());
    }

    #[tokio::test]
    async fn test_requires_token() {
        let backend = DemoBackend::new();
        let err = backend
            .fetch_conversations(&SessionContext::anonymous())
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Unauthorized);
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let backend = DemoBackend::new();
        backend.fail_next(FetchError::Network("offline".into()));
        assert!(backend.fetch_notifications(&ctx(), None).await.is_err());
        assert!(backend.fetch_notifications(&ctx(), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_submitted_post_appears_first() {
        let backend = DemoBackend::new();
        backend
            .submit(
                &ctx(),
                Outgoing::Post {
                    text: "hello".into(),
                    photo: None,
                },
            )
            .await
            .unwrap();
        let page = backend.fetch_timeline_page(&ctx(), None).await.unwrap();
        assert_eq!(page.items[0].body, "hello");
        assert_eq!(page.items[0].author, "me");
    }

    #[tokio::test]
    async fn test_message_lands_in_thread() {
        let backend = DemoBackend::new();
        let status = backend
            .submit(
                &ctx(),
                Outgoing::Message {
                    conversation_id: "c1".into(),
                    text: "ping".into(),
                },
            )
            .await
            .unwrap();
        assert!(status.starts_with("sent to @"));
        let thread = backend.fetch_thread(&ctx(), "c1").await.unwrap();
        assert_eq!(thread.messages.last().map(|m| m.body.as_str()), Some("ping"));
    }

    #[tokio::test]
    async fn test_unknown_thread() {
        let backend = DemoBackend::new();
        assert!(matches!(
            backend.fetch_thread(&ctx(), "nope").await,
            Err(FetchError::NotFound(_))
        ));
    }

    // ==================== Post actions ====================

    #[tokio::test]
    async fn test_like_then_unlike() {
        let backend = DemoBackend::generate(SystemTime::now(), 5);
        // t1 starts out not liked
        let before = backend.fetch_timeline_page(&ctx(), None).await.unwrap().items[1].clone();
        assert!(!before.liked_by_me);

        let like = |like| Outgoing::Like {
            post_id: "t1".into(),
            like,
        };
        assert_eq!(backend.submit(&ctx(), like(true)).await.unwrap(), "liked");
        // liking twice counts once
        backend.submit(&ctx(), like(true)).await.unwrap();
        let liked = backend.fetch_timeline_page(&ctx(), None).await.unwrap().items[1].clone();
        assert!(liked.liked_by_me);
        assert_eq!(liked.likes, before.likes + 1);

        assert_eq!(backend.submit(&ctx(), like(false)).await.unwrap(), "unliked");
        let after = backend.fetch_timeline_page(&ctx(), None).await.unwrap().items[1].clone();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_repost_discover_post() {
        let backend = DemoBackend::generate(SystemTime::now(), 6);
        backend
            .submit(
                &ctx(),
                Outgoing::Repost {
                    post_id: "d1".into(),
                    repost: true,
                },
            )
            .await
            .unwrap();
        let page = backend.fetch_discover_page(&ctx(), None).await.unwrap();
        assert!(page.items[1].reposted_by_me);
    }

    #[tokio::test]
    async fn test_action_on_unknown_post() {
        let backend = DemoBackend::new();
        let err = backend
            .submit(
                &ctx(),
                Outgoing::Like {
                    post_id: "nope".into(),
                    like: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
        assert!(backend.fetch_comments(&ctx(), "nope").await.is_err());
    }

    #[tokio::test]
    async fn test_comments_generated_then_extended() {
        let backend = DemoBackend::generate(SystemTime::now(), 5);
        let post = backend.fetch_timeline_page(&ctx(), None).await.unwrap().items[3].clone();
        let comments = backend.fetch_comments(&ctx(), &post.id).await.unwrap();
        assert_eq!(comments.len(), post.comments as usize);
        assert!(comments.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let status = backend
            .submit(
                &ctx(),
                Outgoing::Comment {
                    post_id: post.id.clone(),
                    text: "nice".into(),
                },
            )
            .await
            .unwrap();
        assert!(status.starts_with("commented on @"));
        let comments = backend.fetch_comments(&ctx(), &post.id).await.unwrap();
        assert_eq!(comments.last().map(|c| c.body.as_str()), Some("nice"));
        assert_eq!(comments.last().map(|c| c.author.as_str()), Some("me"));
        let post = backend.fetch_timeline_page(&ctx(), None).await.unwrap().items[3].clone();
        assert_eq!(post.comments as usize, comments.len());
    }

    #[tokio::test]
    async fn test_post_keeps_photo() {
        let backend = DemoBackend::new();
        let photo = Arc::new(crate::ascii::Frame::filled(
            3,
            2,
            crate::ascii::Cell::new('#', None),
        ));
        backend
            .submit(
                &ctx(),
                Outgoing::Post {
                    text: "look".into(),
                    photo: Some(Arc::clone(&photo)),
                },
            )
            .await
            .unwrap();
        let page = backend.fetch_timeline_page(&ctx(), None).await.unwrap();
        assert_eq!(page.items[0].photo, Some(photo));
    }
}
