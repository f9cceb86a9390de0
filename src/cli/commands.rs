//! Subcommand handlers: the interactive client, play, avatar and config.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossterm::style::{Print, ResetColor, SetForegroundColor};
use crossterm::{cursor, execute, queue};
use tracing_subscriber::EnvFilter;

use super::args::ConfigAction;
use crate::app::{App, SettingsView};
use crate::ascii::{ColorMode, Frame, GlyphRamp};
use crate::avatar;
use crate::backend::{DemoBackend, EnvTokenStore, SessionContext, Token, TokenStore};
use crate::config::{default_log_path, default_path, Config, ConfigError, DEFAULT_CONFIG};
use crate::error::FatalError;
use crate::event_loop::{EventLoop, LoopOptions, Services};
use crate::input::Dispatcher;
use crate::media::{frame_queue, ConversionJob, ConvertOptions, JobEvent, JobId, JobStatus, MediaSource};
use crate::render::{self, Dims, Grid, RenderPipeline, View};
use crate::screen::ScreenManager;
use crate::terminal::TerminalGuard;

/// Avatar size on the settings screen.
const SETTINGS_AVATAR: (u16, u16) = (16, 8);

/// Grid bound used when stdout is not a terminal and no size was given.
const FALLBACK_SIZE: (u16, u16) = (80, 24);

static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Send log records to a file; the terminal belongs to the UI.
///
/// `RUST_LOG` overrides the configured level. Both `log` and `tracing`
/// records end up in the file.
pub fn init_logging(config: &Config, cli_path: Option<&Path>) -> Result<PathBuf, FatalError> {
    let path = cli_path
        .map(PathBuf::from)
        .or_else(|| config.logging.file.clone())
        .unwrap_or_else(default_log_path);

    let open = || -> io::Result<std::fs::File> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)
    };
    let file = open().map_err(|source| FatalError::LogFile {
        path: path.clone(),
        source,
    })?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    if let Err(e) = installed {
        // a subscriber is already set, e.g. by a test harness
        log::debug!("logging already initialized: {e}");
    }
    log::info!("tuitter {} starting", env!("CARGO_PKG_VERSION"));
    Ok(path)
}

/// Run the interactive client until the user quits.
pub fn run_tui(config: &Config, demo: bool, demo_media: Option<PathBuf>) -> Result<(), FatalError> {
    let store = EnvTokenStore::new();
    if demo {
        store.set_token(Token::new("demo"));
    }
    let handle = config
        .session
        .handle
        .clone()
        .or_else(|| demo.then(|| "you".to_string()));
    let session = SessionContext::new(store.get_token(), handle);
    if !session.is_authenticated() {
        log::info!("no token in environment, starting signed out");
    }

    let mut backend = DemoBackend::new();
    if let Some(path) = demo_media {
        backend = backend.with_media(path);
    }
    let backend = Arc::new(backend);
    let services = Services {
        fetcher: backend.clone(),
        actions: backend,
    };

    let (aw, ah) = SETTINGS_AVATAR;
    let settings = SettingsView {
        entries: config.summary(),
        avatar: Some(avatar::generate_with(
            avatar::seed_for_handle(session.handle_or_default()),
            &config.convert_options(aw, ah)?,
        )),
    };
    let app = App::new(ScreenManager::new(config.navigation.history_cap, session), settings);
    let dispatcher = Dispatcher::new(config.keymap()?, config.dispatcher_config());
    let options = LoopOptions {
        convert: config.convert_options(1, 1)?,
        color_mode: config.ascii.color,
        queue_capacity: config.render.queue_capacity,
        tick: config.tick(),
    };
    let event_loop = EventLoop::new(app, dispatcher, services, options);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(FatalError::Runtime)?;

    let mut guard = TerminalGuard::enter().map_err(FatalError::Terminal)?;
    let mut stdout = io::stdout();
    let result = runtime.block_on(event_loop.run(&mut stdout));
    guard.exit().map_err(FatalError::Terminal)?;
    result
}

/// Options for `tuitter play`.
#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub color: Option<ColorMode>,
    pub dither: bool,
    pub ramp: Option<String>,
}

/// Convert a file and draw its frames until it ends or Ctrl-C is pressed.
pub fn play(config: &Config, path: &Path, opts: PlayOptions) -> Result<(), FatalError> {
    let source = MediaSource::file(path);
    let tty = io::stdout().is_terminal();

    // An explicit size is used as is; otherwise the worker fits the source
    // inside the terminal once it has decoded the first picture.
    let (width, height, fit) = match (opts.width, opts.height) {
        (Some(w), Some(h)) => (w, h, false),
        (w, h) => {
            let (tw, th) = if tty {
                crossterm::terminal::size().map_err(FatalError::Dimensions)?
            } else {
                FALLBACK_SIZE
            };
            (w.unwrap_or(tw), h.unwrap_or(th.saturating_sub(1)), true)
        }
    };
    let convert = play_options(config, width.max(1), height.max(1), &opts)?.with_fit(fit);
    let color_mode = convert.mapper.color_mode();

    CTRLC_RECEIVED.store(false, Ordering::SeqCst);
    ctrlc::set_handler(|| CTRLC_RECEIVED.store(true, Ordering::SeqCst))?;

    let (tx, mut rx) = frame_queue(config.render.queue_capacity);
    let mut job = ConversionJob::spawn(JobId(1), source, convert, tx);

    let mut out = io::stdout();
    let mut pipeline = RenderPipeline::new();
    let dims = Dims::new(width, height);
    if tty {
        execute!(out, cursor::Hide).map_err(FatalError::Output)?;
    }

    let drawn = (|| -> io::Result<()> {
        while let Some(event) = rx.blocking_recv() {
            if CTRLC_RECEIVED.load(Ordering::SeqCst) && !job.is_cancel_requested() {
                log::info!("interrupted, cancelling {}", job.id());
                job.cancel();
            }
            job.observe(&event);
            match event {
                JobEvent::Frame { frame, .. } if !job.is_cancel_requested() => {
                    if tty {
                        let writes = pipeline.render(&FrameView(&frame), dims);
                        render::apply(&mut out, &writes, color_mode)?;
                    } else {
                        writeln!(out, "{}", frame.to_string_display())?;
                    }
                }
                JobEvent::Frame { .. } => {}
                JobEvent::Finished { .. } => break,
            }
        }
        Ok(())
    })();

    if tty {
        execute!(out, cursor::MoveTo(0, height), cursor::Show).map_err(FatalError::Output)?;
    }
    drawn.map_err(FatalError::Output)?;

    if rx.dropped() > 0 {
        log::debug!("play: {} frames dropped", rx.dropped());
    }
    match job.acknowledge() {
        JobStatus::Failed(reason) => Err(FatalError::Playback(reason)),
        status => {
            log::info!("play finished: {}", status.label());
            Ok(())
        }
    }
}

fn play_options(config: &Config, width: u16, height: u16, opts: &PlayOptions) -> Result<ConvertOptions, ConfigError> {
    let mut convert = config.convert_options(width, height)?;
    if let Some(ramp) = &opts.ramp {
        convert = convert.with_ramp(GlyphRamp::from_config(ramp)?);
    }
    if let Some(mode) = opts.color {
        convert = convert.with_color_mode(mode);
    }
    if opts.dither {
        convert = convert.with_dither(true);
    }
    Ok(convert)
}

/// A single frame filling the screen from the top-left corner.
struct FrameView<'a>(&'a Frame);

impl View for FrameView<'_> {
    fn draw(&self, grid: &mut Grid) {
        let area = grid.area();
        grid.blit_frame(self.0, 0, 0, area);
    }
}

/// Print the avatar for a seed or handle.
pub fn avatar(
    config: &Config,
    seed: Option<u64>,
    handle: Option<&str>,
    size: (u16, u16),
    color: Option<ColorMode>,
) -> Result<(), FatalError> {
    let seed = seed.unwrap_or_else(|| avatar::seed_for_handle(handle.unwrap_or_default()));
    let mut opts = config.convert_options(size.0, size.1)?;
    if let Some(mode) = color {
        opts = opts.with_color_mode(mode);
    }
    let mode = opts.mapper.color_mode();
    let frame = avatar::generate_with(seed, &opts);
    let mut out = io::stdout();
    print_frame(&mut out, &frame, mode).map_err(FatalError::Output)
}

/// Write a frame line by line at the cursor, colored per `mode`.
pub fn print_frame<W: Write>(out: &mut W, frame: &Frame, mode: ColorMode) -> io::Result<()> {
    for row in frame.rows() {
        for cell in row {
            if let Some(color) = cell.color().and_then(|rgb| render::terminal_color(rgb, mode)) {
                queue!(out, SetForegroundColor(color))?;
            }
            queue!(out, Print(cell.glyph()))?;
        }
        if mode.is_color() {
            queue!(out, ResetColor)?;
        }
        queue!(out, Print('\n'))?;
    }
    out.flush()
}

/// Handle config subcommand actions.
pub fn handle_config_action(config: &Config, config_path: Option<&Path>, action: ConfigAction) -> Result<(), FatalError> {
    let path = config_path.map(PathBuf::from).unwrap_or_else(default_path);
    match action {
        ConfigAction::Show => {
            println!("Current configuration:");
            let width = config.summary().iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            for (key, value) in config.summary() {
                println!("  {key:<width$}  {value}");
            }
            println!();
            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found)", path.display());
            }
            Ok(())
        }
        ConfigAction::Init => {
            init_config(&path)?;
            println!("Created config file: {}", path.display());
            Ok(())
        }
    }
}

/// Write the commented default config to `path`, which must not exist.
pub fn init_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "config file already exists"),
        });
    }
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, DEFAULT_CONFIG).map_err(io_err)?;
    log::info!("wrote default config to {}", path.display());
    Ok(())
}
