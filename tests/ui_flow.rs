//! End-to-end tests for the UI loop, driven headless.
//!
//! Keys are fed straight into the event loop and fetches are pumped one at
//! a time, so no terminal is needed.
//!
//! These tests verify:
//! - Screens load their feeds and keep state across Back
//! - Results for a screen the user already left are dropped
//! - Failed loads offer a retry
//! - Opening a post with media runs a conversion in the panel
//! - A key that breaks a held prefix runs both resulting commands
//! - Likes show at once and roll back when refused
//! - Comments open in a panel, take drafts and close on Esc
//! - An attached photo goes out with the next post
//! - Rendering an unchanged screen writes nothing

use std::sync::Arc;
use std::time::{Duration, Instant};

use tuitter::app::{App, FetchMessage, FetchOutcome, LoadStatus, MediaPanel, SettingsView, StatusKind};
use tuitter::ascii::ColorMode;
use tuitter::backend::{DemoBackend, FetchError, Page, SessionContext, Token};
use tuitter::config::Config;
use tuitter::event_loop::{EventLoop, Flow, LoopOptions, Services};
use tuitter::input::{Dispatcher, DispatcherConfig, Key, KeyMap, KeyPress};
use tuitter::media::{ConvertOptions, JobStatus};
use tuitter::render::{Dims, RenderPipeline};
use tuitter::screen::{Command, Screen, ScreenManager};

fn signed_in() -> SessionContext {
    SessionContext::new(Some(Token::new("t")), Some("me".into()))
}

fn event_loop(backend: DemoBackend, session: SessionContext) -> EventLoop {
    event_loop_with_keys(backend, session, KeyMap::defaults())
}

fn event_loop_with_keys(backend: DemoBackend, session: SessionContext, keymap: KeyMap) -> EventLoop {
    let backend = Arc::new(backend);
    let services = Services {
        fetcher: backend.clone(),
        actions: backend,
    };
    let settings = SettingsView {
        entries: Config::default().summary(),
        avatar: Some(tuitter::avatar::generate(7, 16, 8)),
    };
    let app = App::new(ScreenManager::new(16, session), settings);
    let dispatcher = Dispatcher::new(keymap, DispatcherConfig::default());
    let options = LoopOptions {
        convert: ConvertOptions::new(1, 1),
        color_mode: ColorMode::Mono,
        queue_capacity: 2,
        tick: Duration::from_millis(33),
    };
    let mut l = EventLoop::new(app, dispatcher, services, options);
    l.resize(Dims::new(100, 30));
    l
}

fn press(l: &mut EventLoop, keys: &[KeyPress]) -> Flow {
    let mut flow = Flow::Continue;
    for key in keys {
        flow = l.handle_key(*key, Instant::now());
    }
    flow
}

// ==================== Navigation ====================

#[tokio::test]
async fn test_two_three_back_restores_discover() {
    let mut l = event_loop(DemoBackend::new(), signed_in());
    l.start();
    assert!(l.pump_fetch().await);
    assert_eq!(l.app().timeline().status(), &LoadStatus::Ready);

    press(&mut l, &[KeyPress::char('2')]);
    assert!(l.pump_fetch().await);
    assert_eq!(l.app().discover().status(), &LoadStatus::Ready);

    press(&mut l, &[KeyPress::char('3'), KeyPress::plain(Key::Backspace)]);
    assert_eq!(l.app().active(), Screen::Discover);
    assert_eq!(
        l.app().manager().navigation().history().collect::<Vec<_>>(),
        vec![Screen::Timeline]
    );
    assert!(!l.app().discover().items().is_empty());
}

#[tokio::test]
async fn test_stale_list_result_is_dropped() {
    let mut l = event_loop(DemoBackend::new(), signed_in());
    let old_epoch = l.app().manager().epoch();
    press(&mut l, &[KeyPress::char('2')]);
    assert_ne!(l.app().manager().epoch(), old_epoch);

    l.handle_fetch(FetchMessage {
        epoch: old_epoch,
        outcome: FetchOutcome::Posts {
            screen: Screen::Discover,
            append: false,
            result: Ok(Page::last(Vec::new())),
        },
    });
    assert_eq!(l.app().discover().status(), &LoadStatus::Loading);
}

#[tokio::test]
async fn test_leaving_a_screen_aborts_its_fetch() {
    let backend = DemoBackend::new().with_latency(Duration::from_millis(200));
    let mut l = event_loop(backend, signed_in());
    press(&mut l, &[KeyPress::char('2')]);
    assert_eq!(l.executor().in_flight(), 1);
    press(&mut l, &[KeyPress::char('5')]);
    assert_eq!(l.app().active(), Screen::Settings);
    assert_eq!(l.executor().in_flight(), 0);
}

#[tokio::test]
async fn test_key_that_breaks_a_prefix_runs_both_commands() {
    let mut keymap = KeyMap::defaults();
    keymap.bind_str("x", "screen-discover").unwrap();
    keymap.bind_str("x x", "quit").unwrap();
    let mut l = event_loop_with_keys(DemoBackend::new(), signed_in(), keymap);

    assert_eq!(press(&mut l, &[KeyPress::char('x')]), Flow::Continue);
    assert_eq!(l.app().active(), Screen::Timeline);
    assert!(l.dispatcher().deadline().is_some());

    // `3` cannot extend `x`, so `x` resolves and `3` runs right after it.
    press(&mut l, &[KeyPress::char('3')]);
    assert_eq!(l.app().active(), Screen::Messages);
    assert_eq!(
        l.app().manager().navigation().history().collect::<Vec<_>>(),
        vec![Screen::Timeline, Screen::Discover]
    );
    assert!(l.dispatcher().deadline().is_none());

    press(&mut l, &[KeyPress::char('4')]);
    assert_eq!(l.app().active(), Screen::Notifications);
}

#[tokio::test]
async fn test_resolved_prefix_then_quit_stops_the_loop() {
    let mut keymap = KeyMap::defaults();
    keymap.bind_str("x", "screen-discover").unwrap();
    keymap.bind_str("x x", "screen-messages").unwrap();
    let mut l = event_loop_with_keys(DemoBackend::new(), signed_in(), keymap);

    press(&mut l, &[KeyPress::char('x')]);
    assert_eq!(press(&mut l, &[KeyPress::char('q')]), Flow::Quit);
    assert!(l.app().manager().is_terminated());
}

// ==================== Failures ====================

#[tokio::test]
async fn test_failed_load_then_retry() {
    let backend = DemoBackend::new();
    backend.fail_next(FetchError::Network("down".into()));
    let mut l = event_loop(backend, signed_in());
    l.start();
    assert!(l.pump_fetch().await);

    let status = l.app().status().cloned().unwrap();
    assert_eq!(status.text, "network error: down. Press r to retry");
    assert_eq!(status.kind, StatusKind::Error);
    assert!(matches!(l.app().timeline().status(), LoadStatus::Failed(_)));

    press(&mut l, &[KeyPress::char('r')]);
    assert!(l.pump_fetch().await);
    assert_eq!(l.app().timeline().status(), &LoadStatus::Ready);
}

#[tokio::test]
async fn test_signed_out_never_fetches() {
    let mut l = event_loop(DemoBackend::new(), SessionContext::anonymous());
    l.start();
    press(&mut l, &[KeyPress::char('2'), KeyPress::char('r'), KeyPress::plain(Key::Enter)]);
    assert_eq!(l.executor().in_flight(), 0);
    assert!(l.app().manager().shows_login_placeholder());
}

// ==================== Media ====================

#[tokio::test]
async fn test_open_post_with_picture_converts_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cat.png");
    image::RgbImage::from_pixel(32, 16, image::Rgb([200, 120, 40]))
        .save(&path)
        .unwrap();

    let mut l = event_loop(DemoBackend::new().with_media(&path), signed_in());
    l.start();
    assert!(l.pump_fetch().await);
    press(&mut l, &[KeyPress::plain(Key::Enter)]);
    assert!(matches!(l.app().media(), MediaPanel::Running(_) | MediaPanel::Finished { .. }));

    while matches!(l.app().media(), MediaPanel::Running(_)) {
        assert!(l.pump_job_event().await);
    }
    match l.app().media() {
        MediaPanel::Finished { status, frame, .. } => {
            assert!(matches!(status, JobStatus::Done(_)));
            assert!(frame.is_some());
        }
        other => panic!("unexpected panel {other:?}"),
    }

    press(&mut l, &[KeyPress::plain(Key::Esc)]);
    assert!(matches!(l.app().media(), MediaPanel::Hidden));
}

#[tokio::test]
async fn test_missing_media_shows_error_banner() {
    let mut l = event_loop(DemoBackend::new(), signed_in());
    l.handle_command(Command::StartConversion(tuitter::media::MediaSource::file(
        "/nonexistent/clip.gif",
    )));
    while matches!(l.app().media(), MediaPanel::Running(_)) {
        assert!(l.pump_job_event().await);
    }
    assert!(matches!(
        l.app().media(),
        MediaPanel::Finished {
            status: JobStatus::Failed(_),
            ..
        }
    ));
    let mut out = Vec::new();
    l.render(&mut out).unwrap();
    let text = String::from_utf8_lossy(&out);
    assert!(text.contains("conversion failed"));
}

#[tokio::test]
async fn test_conversion_is_fitted_inside_the_content_area() {
    let mut l = event_loop(DemoBackend::new(), signed_in());
    let wide = tuitter::media::PixelBuffer::gray(400, 100, 128);
    l.start_conversion(tuitter::media::MediaSource::pixels(wide));
    while matches!(l.app().media(), MediaPanel::Running(_)) {
        assert!(l.pump_job_event().await);
    }
    let frame = match l.app().media() {
        MediaPanel::Finished { frame: Some(frame), .. } => Arc::clone(frame),
        other => panic!("unexpected panel {other:?}"),
    };
    let content = tuitter::render::Regions::new(l.dims()).content;
    let bound = (content.width, content.height - 1);
    assert_eq!(
        (frame.width(), frame.height()),
        tuitter::ascii::fit_grid(400, 100, bound.0, bound.1, tuitter::ascii::DEFAULT_CELL_ASPECT_RATIO)
    );
    assert!(frame.height() < bound.1);
}

// ==================== Post actions ====================

fn type_line(l: &mut EventLoop, text: &str) {
    let keys: Vec<_> = text.chars().map(KeyPress::char).collect();
    press(l, &keys);
    press(l, &[KeyPress::plain(Key::Enter)]);
}

#[tokio::test]
async fn test_like_key_toggles_focused_post() {
    let mut l = event_loop(DemoBackend::new(), signed_in());
    l.start();
    assert!(l.pump_fetch().await);
    let before = l.app().timeline().items()[0].clone();

    press(&mut l, &[KeyPress::char('l')]);
    assert_eq!(l.app().timeline().items()[0].liked_by_me, !before.liked_by_me);

    assert!(l.pump_fetch().await);
    let expected = if before.liked_by_me { "unliked" } else { "liked" };
    assert_eq!(l.app().status().unwrap().text, expected);
    assert_eq!(l.app().timeline().items()[0].liked_by_me, !before.liked_by_me);
}

#[tokio::test]
async fn test_refused_like_is_rolled_back() {
    let backend = DemoBackend::new();
    let mut l = event_loop(backend.clone(), signed_in());
    l.start();
    assert!(l.pump_fetch().await);
    let before = l.app().timeline().items()[0].clone();

    backend.fail_next(FetchError::Network("down".into()));
    press(&mut l, &[KeyPress::char('l')]);
    assert!(l.pump_fetch().await);

    let after = &l.app().timeline().items()[0];
    assert_eq!(after.liked_by_me, before.liked_by_me);
    assert_eq!(after.likes, before.likes);
    assert_eq!(l.app().status().unwrap().kind, StatusKind::Error);
}

#[tokio::test]
async fn test_comment_on_a_post() {
    let mut l = event_loop(DemoBackend::new(), signed_in());
    l.start();
    assert!(l.pump_fetch().await);
    let post = l.app().timeline().items()[0].clone();

    press(&mut l, &[KeyPress::char('c')]);
    assert_eq!(l.app().comments().unwrap().status, LoadStatus::Loading);
    assert!(l.pump_fetch().await);
    let panel = l.app().comments().unwrap();
    assert_eq!(panel.status, LoadStatus::Ready);
    assert_eq!(panel.comments.len(), post.comments as usize);

    press(&mut l, &[KeyPress::char('i')]);
    type_line(&mut l, "well said");
    // the submission, then the reloaded comments
    assert!(l.pump_fetch().await);
    assert!(l.app().status().unwrap().text.starts_with("commented on @"));
    assert!(l.pump_fetch().await);
    let panel = l.app().comments().unwrap();
    assert_eq!(panel.comments.last().unwrap().body, "well said");
    assert_eq!(l.app().timeline().items()[0].comments, post.comments + 1);

    press(&mut l, &[KeyPress::plain(Key::Esc)]);
    assert!(l.app().comments().is_none());
}

#[tokio::test]
async fn test_attached_photo_goes_out_with_next_post() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sunset.png");
    image::RgbImage::from_pixel(240, 120, image::Rgb([250, 250, 250]))
        .save(&path)
        .unwrap();

    let mut l = event_loop(DemoBackend::new(), signed_in());
    l.start();
    assert!(l.pump_fetch().await);

    press(&mut l, &[KeyPress::char(':')]);
    type_line(&mut l, &format!("attach {}", path.display()));
    assert!(l.pump_fetch().await);
    let photo = Arc::clone(l.app().pending_photo().unwrap());
    assert_eq!((photo.width(), photo.height()), (60, 15));

    press(&mut l, &[KeyPress::char('i')]);
    type_line(&mut l, "look");
    // the post, then the reloaded timeline
    assert!(l.pump_fetch().await);
    assert!(l.app().pending_photo().is_none());
    assert!(l.pump_fetch().await);
    let newest = &l.app().timeline().items()[0];
    assert_eq!(newest.body, "look");
    assert_eq!(newest.photo.as_deref(), Some(photo.as_ref()));
}

// ==================== Rendering ====================

#[tokio::test]
async fn test_settings_screen_renders_once() {
    let mut l = event_loop(DemoBackend::new(), signed_in());
    press(&mut l, &[KeyPress::char('5')]);
    let mut out = Vec::new();
    l.render(&mut out).unwrap();
    assert!(String::from_utf8_lossy(&out).contains("Settings"));
    out.clear();
    l.render(&mut out).unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_resize_redraws_everything() {
    let mut l = event_loop(DemoBackend::new(), signed_in());
    press(&mut l, &[KeyPress::char('5')]);
    let mut out = Vec::new();
    l.render(&mut out).unwrap();
    out.clear();

    l.resize(Dims::new(60, 20));
    l.render(&mut out).unwrap();
    let text = String::from_utf8_lossy(&out);
    assert!(text.contains("\x1b[2J"));
}

#[test]
fn test_pipeline_on_app_without_terminal() {
    let app = App::new(ScreenManager::new(4, SessionContext::anonymous()), SettingsView::default());
    let mut pipeline = RenderPipeline::new();
    let first = pipeline.render(&app, Dims::new(40, 10));
    assert!(!first.is_empty());
    assert!(pipeline.render(&app, Dims::new(40, 10)).is_empty());
    assert!(pipeline.render(&app, Dims::new(0, 10)).is_empty());
}

#[tokio::test]
async fn test_quit_key() {
    let mut l = event_loop(DemoBackend::new(), signed_in());
    assert_eq!(press(&mut l, &[KeyPress::char('q')]), Flow::Quit);
}
