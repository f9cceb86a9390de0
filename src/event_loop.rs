//! The cooperative UI loop.
//!
//! One task owns all UI state. It waits on four sources at once with
//! `tokio::select!`:
//! 1. Terminal events (keys, resize) via crossterm's `EventStream`
//! 2. Finished fetches from tasks spawned by the [`Executor`]
//! 3. Frames from the running conversion worker
//! 4. The render tick and the key-sequence deadline
//!
//! Nothing in here blocks; slow work runs on tasks or the worker thread and
//! reports back through channels.

use std::io;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::app::{App, FetchMessage, FetchOutcome, Request};
use crate::ascii::ColorMode;
use crate::backend::{ContentActions, DataFetcher, SessionContext};
use crate::error::FatalError;
use crate::input::{Dispatcher, KeyPress};
use crate::media::{
    ascii_photo, frame_queue, ConversionJob, ConvertOptions, FrameReceiver, JobEvent, JobId, MediaSource,
};
use crate::render::{self, page_size, Dims, Regions, RenderPipeline};
use crate::screen::{Command, Effect, Screen};

/// The backend collaborators.
#[derive(Clone)]
pub struct Services {
    pub fetcher: Arc<dyn DataFetcher>,
    pub actions: Arc<dyn ContentActions>,
}

/// Whether the loop keeps going after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Runs backend requests as tasks and reports results on a channel.
///
/// List fetches are tracked so a screen change can abort them; content
/// actions always run to completion.
pub struct Executor {
    services: Services,
    tx: mpsc::UnboundedSender<FetchMessage>,
    in_flight: Vec<JoinHandle<()>>,
}

impl Executor {
    pub fn new(services: Services) -> (Self, mpsc::UnboundedReceiver<FetchMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                services,
                tx,
                in_flight: Vec::new(),
            },
            rx,
        )
    }

    /// Start `request` on a task. Must be called inside a tokio runtime.
    pub fn spawn(&mut self, request: Request, epoch: u64, ctx: &SessionContext) {
        let tx = self.tx.clone();
        let fetcher = &self.services.fetcher;
        let actions = &self.services.actions;
        log::debug!("epoch {epoch}: {request:?}");

        match request {
            Request::Load { screen, cursor } => {
                let append = cursor.is_some();
                let handle = match screen {
                    Screen::Timeline | Screen::Discover => {
                        let fut = if screen == Screen::Timeline {
                            fetcher.fetch_timeline_page(ctx, cursor)
                        } else {
                            fetcher.fetch_discover_page(ctx, cursor)
                        };
                        tokio::spawn(async move {
                            let result = fut.await;
                            let outcome = FetchOutcome::Posts { screen, append, result };
                            let _ = tx.send(FetchMessage { epoch, outcome });
                        })
                    }
                    Screen::Messages => {
                        let fut = fetcher.fetch_conversations(ctx);
                        tokio::spawn(async move {
                            let outcome = FetchOutcome::Conversations(fut.await);
                            let _ = tx.send(FetchMessage { epoch, outcome });
                        })
                    }
                    Screen::Notifications => {
                        let fut = fetcher.fetch_notifications(ctx, cursor);
                        tokio::spawn(async move {
                            let result = fut.await;
                            let outcome = FetchOutcome::Notifications { append, result };
                            let _ = tx.send(FetchMessage { epoch, outcome });
                        })
                    }
                    Screen::Settings => return,
                };
                self.track(handle);
            }
            Request::Thread { conversation_id } => {
                let fut = fetcher.fetch_thread(ctx, &conversation_id);
                let handle = tokio::spawn(async move {
                    let outcome = FetchOutcome::Thread(fut.await);
                    let _ = tx.send(FetchMessage { epoch, outcome });
                });
                self.track(handle);
            }
            Request::Open(target) => {
                let fut = actions.open(ctx, target);
                tokio::spawn(async move {
                    let outcome = FetchOutcome::Opened(fut.await);
                    let _ = tx.send(FetchMessage { epoch, outcome });
                });
            }
            Request::Submit(outgoing) => {
                let fut = actions.submit(ctx, outgoing.clone());
                tokio::spawn(async move {
                    let result = fut.await;
                    let outcome = FetchOutcome::Submitted { outgoing, result };
                    let _ = tx.send(FetchMessage { epoch, outcome });
                });
            }
            Request::Comments { post_id } => {
                let fut = fetcher.fetch_comments(ctx, &post_id);
                let handle = tokio::spawn(async move {
                    let result = fut.await;
                    let outcome = FetchOutcome::Comments { post_id, result };
                    let _ = tx.send(FetchMessage { epoch, outcome });
                });
                self.track(handle);
            }
            Request::Photo(path) => {
                tokio::spawn(async move {
                    let converted = tokio::task::spawn_blocking(move || ascii_photo(&path)).await;
                    let result = match converted {
                        Ok(Ok(frame)) => Ok(Arc::new(frame)),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(e) => Err(format!("photo conversion stopped: {e}")),
                    };
                    let _ = tx.send(FetchMessage {
                        epoch,
                        outcome: FetchOutcome::Photo(result),
                    });
                });
            }
        }
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.in_flight.retain(|h| !h.is_finished());
        self.in_flight.push(handle);
    }

    /// Abort every tracked fetch; their results would be stale anyway.
    pub fn abort_fetches(&mut self) {
        let n = self.in_flight.len();
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
        if n > 0 {
            log::debug!("aborted {n} in-flight fetches");
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.iter().filter(|h| !h.is_finished()).count()
    }
}

/// Settings the loop needs beyond the app itself.
#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// Glyph settings for conversions; width and height are set per job.
    pub convert: ConvertOptions,
    pub color_mode: ColorMode,
    pub queue_capacity: usize,
    pub tick: std::time::Duration,
}

pub struct EventLoop {
    app: App,
    dispatcher: Dispatcher,
    executor: Executor,
    fetches: mpsc::UnboundedReceiver<FetchMessage>,
    frames: Option<FrameReceiver>,
    pipeline: RenderPipeline,
    dims: Dims,
    options: LoopOptions,
    next_job: u64,
}

impl EventLoop {
    pub fn new(app: App, dispatcher: Dispatcher, services: Services, options: LoopOptions) -> Self {
        let (executor, fetches) = Executor::new(services);
        Self {
            app,
            dispatcher,
            executor,
            fetches,
            frames: None,
            pipeline: RenderPipeline::new(),
            dims: Dims::default(),
            options,
            next_job: 1,
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// Issue the initial load of the active screen.
    pub fn start(&mut self) {
        if let Some(effect) = self.app.manager().initial_effect() {
            self.run_effect(effect);
        }
    }

    pub fn resize(&mut self, dims: Dims) {
        self.dims = dims;
        self.dispatcher.set_page_size(page_size(dims, self.app.active()));
    }

    /// Feed one key and apply every command it releases, in order.
    pub fn handle_key(&mut self, key: KeyPress, now: Instant) -> Flow {
        let mut next = self.dispatcher.dispatch(key, now);
        let mut flow = Flow::Continue;
        while let Some(command) = next {
            flow = self.handle_command(command);
            if flow == Flow::Quit {
                break;
            }
            next = self.dispatcher.poll(now);
        }
        self.app.set_input(self.dispatcher.mode(), self.dispatcher.buffer());
        flow
    }

    /// Resolve a held key sequence whose deadline has passed.
    pub fn handle_deadline(&mut self, now: Instant) -> Flow {
        let mut flow = Flow::Continue;
        while let Some(command) = self.dispatcher.poll(now) {
            flow = self.handle_command(command);
            if flow == Flow::Quit {
                break;
            }
        }
        self.app.set_input(self.dispatcher.mode(), self.dispatcher.buffer());
        flow
    }

    pub fn handle_command(&mut self, command: Command) -> Flow {
        let before = self.app.active();
        let effect = match self.app.manager_mut().apply(command) {
            Ok(effect) => effect,
            Err(e) => {
                log::debug!("{e}");
                return Flow::Quit;
            }
        };

        if self.app.active() != before {
            self.executor.abort_fetches();
            self.app.on_screen_change();
            self.app.clear_status();
            self.dispatcher.set_page_size(page_size(self.dims, self.app.active()));
        }

        let flow = match effect {
            Some(effect) => self.run_effect(effect),
            None => Flow::Continue,
        };
        if let Some(request) = self.app.more_wanted() {
            self.issue(request);
        }
        flow
    }

    fn run_effect(&mut self, effect: Effect) -> Flow {
        match effect {
            Effect::Quit => return Flow::Quit,
            Effect::StartConversion(source) => self.start_conversion(source),
            Effect::CancelConversion => {
                if !self.app.cancel_conversion() {
                    self.app.close_comments();
                }
            }
            Effect::Open(selection) => {
                if let Some(path) = self.app.media_for(selection) {
                    self.start_conversion(MediaSource::File(path));
                }
                if let Some(request) = self.app.resolve_open(selection) {
                    self.issue(request);
                }
            }
            other => {
                if let Some(request) = self.app.request_for(&other) {
                    self.issue(request);
                }
            }
        }
        Flow::Continue
    }

    fn issue(&mut self, request: Request) {
        self.app.begin(&request);
        let epoch = self.app.manager().epoch();
        let ctx = self.app.session().clone();
        self.executor.spawn(request, epoch, &ctx);
    }

    /// Bounding grid for a conversion shown in the content area. The worker
    /// fits it to the source once the first picture is decoded.
    fn conversion_bound(&self) -> (u16, u16) {
        let content = Regions::new(self.dims).content;
        (content.width.max(1), content.height.saturating_sub(1).max(1))
    }

    /// Spawn a worker for `source`. Never touches the file on this task.
    pub fn start_conversion(&mut self, source: MediaSource) {
        let (width, height) = self.conversion_bound();
        let opts = ConvertOptions {
            width,
            height,
            fit: true,
            ..self.options.convert.clone()
        };
        let id = JobId(self.next_job);
        self.next_job += 1;
        let (tx, rx) = frame_queue(self.options.queue_capacity);
        self.frames = Some(rx);
        self.app.start_conversion(ConversionJob::spawn(id, source, opts, tx));
    }

    pub fn handle_fetch(&mut self, message: FetchMessage) {
        let follow_up = self.app.apply_fetch(message);
        for request in follow_up {
            self.issue(request);
        }
        if let Some(request) = self.app.more_wanted() {
            self.issue(request);
        }
    }

    pub fn handle_job_event(&mut self, event: JobEvent) {
        self.app.observe(&event);
    }

    /// Wait for one finished request and apply it. Returns `false` if no
    /// request can ever finish.
    pub async fn pump_fetch(&mut self) -> bool {
        match self.fetches.recv().await {
            Some(message) => {
                self.handle_fetch(message);
                true
            }
            None => false,
        }
    }

    /// Wait for one conversion event and apply it. Returns `false` when no
    /// conversion is feeding the loop.
    pub async fn pump_job_event(&mut self) -> bool {
        let event = match self.frames.as_mut() {
            Some(rx) => rx.recv().await,
            None => return false,
        };
        match event {
            Some(event) => {
                self.handle_job_event(event);
                true
            }
            None => {
                self.frames = None;
                false
            }
        }
    }

    /// Diff the app against the screen and write the changes.
    pub fn render<W: io::Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.app.set_now(SystemTime::now());
        let writes = self.pipeline.render(&self.app, self.dims);
        render::apply(out, &writes, self.options.color_mode)
    }

    /// Drive the loop until quit.
    pub async fn run<W: io::Write>(mut self, out: &mut W) -> Result<(), FatalError> {
        let (width, height) = crossterm::terminal::size().map_err(FatalError::Dimensions)?;
        self.resize(Dims::new(width, height));
        self.start();
        self.render(out).map_err(FatalError::Output)?;

        let mut events = EventStream::new();
        let mut tick = tokio::time::interval(self.options.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let deadline = self.dispatcher.deadline();
            let flow = tokio::select! {
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) => match KeyPress::from_event(&key) {
                        Some(key) => self.handle_key(key, Instant::now()),
                        None => Flow::Continue,
                    },
                    Some(Ok(Event::Resize(w, h))) => {
                        self.resize(Dims::new(w, h));
                        self.render(out).map_err(FatalError::Output)?;
                        Flow::Continue
                    }
                    Some(Ok(_)) => Flow::Continue,
                    Some(Err(e)) => return Err(FatalError::Terminal(e)),
                    None => Flow::Quit,
                },
                Some(message) = self.fetches.recv() => {
                    self.handle_fetch(message);
                    Flow::Continue
                }
                event = next_job_event(&mut self.frames) => {
                    match event {
                        Some(event) => self.handle_job_event(event),
                        None => self.frames = None,
                    }
                    Flow::Continue
                }
                _ = wait_until(deadline) => self.handle_deadline(Instant::now()),
                _ = tick.tick() => {
                    self.render(out).map_err(FatalError::Output)?;
                    Flow::Continue
                }
            };
            if flow == Flow::Quit {
                break;
            }
        }

        log::info!("shutting down");
        self.executor.abort_fetches();
        self.app.shutdown();
        Ok(())
    }
}

async fn next_job_event(frames: &mut Option<FrameReceiver>) -> Option<JobEvent> {
    match frames {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}
