//! Configuration file handling for tuitter.
//!
//! Loads configuration from `~/.config/tuitter/config.toml` or a custom path.
//! Every field has a default, so an empty or missing file is valid.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::ascii::{ColorMode, GlyphMapper, GlyphRamp, RampError, DEFAULT_CELL_ASPECT_RATIO};
use crate::input::{DispatcherConfig, InputError, KeyMap, TimeoutPolicy, DEFAULT_SEQUENCE_TIMEOUT};
use crate::media::{ConvertOptions, FfmpegTools, DEFAULT_QUEUE_CAPACITY};
use crate::screen::DEFAULT_HISTORY_CAP;

/// Written by `tuitter config init`.
pub const DEFAULT_CONFIG: &str = r#"# tuitter configuration

[ascii]
# standard, blocks, minimal, dense, or a literal ramp from sparse to dense
ramp = "standard"
# mono, ansi16 or truecolor
color = "mono"
dither = false
gamma = 1.0
cell_aspect = 2.0

[media]
# programs used to decode video
ffmpeg = "ffmpeg"
ffprobe = "ffprobe"

[navigation]
history_cap = 32

[keys]
timeout_ms = 400
# resolve or discard
on_timeout = "resolve"
eager = false

[keys.bindings]
# "g g" = "focus-first"

[render]
tick_ms = 33
queue_capacity = 2

[session]
# handle = "you"

[logging]
level = "info"
# file = "/tmp/tuitter.log"
"#;

/// Configuration file structure for tuitter.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub ascii: AsciiConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AsciiConfig {
    pub ramp: String,
    pub color: ColorMode,
    pub dither: bool,
    pub gamma: f32,
    pub cell_aspect: f32,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            ramp: "standard".to_string(),
            color: ColorMode::default(),
            dither: false,
            gamma: 1.0,
            cell_aspect: DEFAULT_CELL_ASPECT_RATIO,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MediaConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        let tools = FfmpegTools::default();
        Self {
            ffmpeg: tools.ffmpeg,
            ffprobe: tools.ffprobe,
        }
    }
}

impl MediaConfig {
    pub fn tools(&self) -> FfmpegTools {
        FfmpegTools {
            ffprobe: self.ffprobe.clone(),
            ffmpeg: self.ffmpeg.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct NavigationConfig {
    pub history_cap: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            history_cap: DEFAULT_HISTORY_CAP,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct KeysConfig {
    pub timeout_ms: u64,
    pub on_timeout: TimeoutPolicy,
    pub eager: bool,
    /// Key sequence to action name. An empty action unbinds the sequence.
    pub bindings: BTreeMap<String, String>,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_SEQUENCE_TIMEOUT.as_millis() as u64,
            on_timeout: TimeoutPolicy::Resolve,
            eager: false,
            bindings: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub tick_ms: u64,
    pub queue_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tick_ms: 33,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid [ascii] ramp: {0}")]
    Ramp(#[from] RampError),

    #[error("invalid key binding '{keys}': {source}")]
    Binding {
        keys: String,
        #[source]
        source: InputError,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl Config {
    /// Load configuration from an explicit path, which must exist, or from
    /// the default path, which may be missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some();
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !explicit && !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        let config = Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.clone(),
                source,
            },
            other => other,
        })?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can only be checked after deserializing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mapper()?;
        self.keymap()?;
        if !(self.ascii.cell_aspect.is_finite() && self.ascii.cell_aspect > 0.0) {
            return Err(ConfigError::Invalid {
                field: "ascii.cell_aspect",
                reason: format!("{} is not a positive number", self.ascii.cell_aspect),
            });
        }
        if !(self.ascii.gamma.is_finite() && self.ascii.gamma > 0.0) {
            return Err(ConfigError::Invalid {
                field: "ascii.gamma",
                reason: format!("{} is not a positive number", self.ascii.gamma),
            });
        }
        if self.render.tick_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "render.tick_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn mapper(&self) -> Result<GlyphMapper, ConfigError> {
        let ramp = GlyphRamp::from_config(&self.ascii.ramp)?;
        Ok(GlyphMapper::new(ramp, self.ascii.color).with_gamma(self.ascii.gamma))
    }

    /// Default bindings with the configured overrides applied.
    pub fn keymap(&self) -> Result<KeyMap, ConfigError> {
        let mut map = KeyMap::defaults();
        for (keys, action) in &self.keys.bindings {
            let result = if action.trim().is_empty() {
                crate::input::parse_sequence(keys).map(|seq| map.unbind(&seq))
            } else {
                map.bind_str(keys, action)
            };
            result.map_err(|source| ConfigError::Binding {
                keys: keys.clone(),
                source,
            })?;
        }
        Ok(map)
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            timeout: Duration::from_millis(self.keys.timeout_ms),
            on_timeout: self.keys.on_timeout,
            eager: self.keys.eager,
        }
    }

    /// Conversion options for a `width` x `height` grid.
    pub fn convert_options(&self, width: u16, height: u16) -> Result<ConvertOptions, ConfigError> {
        Ok(ConvertOptions::new(width, height)
            .with_mapper(self.mapper()?)
            .with_dither(self.ascii.dither)
            .with_cell_aspect(self.ascii.cell_aspect)
            .with_tools(self.media.tools()))
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.render.tick_ms.max(1))
    }

    /// Key/value lines for the settings screen and `config show`.
    pub fn summary(&self) -> Vec<(String, String)> {
        let bindings = if self.keys.bindings.is_empty() {
            "defaults".to_string()
        } else {
            format!("defaults + {} custom", self.keys.bindings.len())
        };
        vec![
            ("ramp".into(), self.ascii.ramp.clone()),
            ("color".into(), self.ascii.color.to_string()),
            ("dither".into(), self.ascii.dither.to_string()),
            ("gamma".into(), self.ascii.gamma.to_string()),
            ("cell aspect".into(), self.ascii.cell_aspect.to_string()),
            ("ffmpeg".into(), self.media.ffmpeg.display().to_string()),
            ("history cap".into(), self.navigation.history_cap.to_string()),
            ("key timeout".into(), format!("{} ms", self.keys.timeout_ms)),
            (
                "on timeout".into(),
                match self.keys.on_timeout {
                    TimeoutPolicy::Resolve => "resolve".into(),
                    TimeoutPolicy::Discard => "discard".into(),
                },
            ),
            ("eager keys".into(), self.keys.eager.to_string()),
            ("bindings".into(), bindings),
            ("render tick".into(), format!("{} ms", self.render.tick_ms)),
            ("frame queue".into(), self.render.queue_capacity.to_string()),
            ("log level".into(), self.logging.level.clone()),
        ]
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("tuitter").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/tuitter/config.toml")
        })
}

/// Where logs go when neither the CLI nor the config names a file.
pub fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|d| d.join("tuitter").join("tuitter.log"))
        .unwrap_or_else(|| std::env::temp_dir().join("tuitter.log"))
}
