//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Rendering defaults.
    pub render: RenderDefaults,

    /// Overlay appearance.
    pub overlay: OverlayConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Arguments remembered from the previous invocation.
    pub remembered: RememberedArgs,
}

/// Default render parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Seconds of footage kept before and after each lap.
    pub bookend_secs: u32,

    /// Capacity of the producer/consumer frame queue.
    pub queue_capacity: usize,

    /// Progress is logged every N written frames.
    pub progress_every_frames: u64,

    /// Frames skipped by a coarse calibration step.
    pub coarse_step_frames: i64,

    /// Two videos closer than this are treated as one split recording.
    pub merge_window_secs: f64,

    /// Directory for rendered files.
    pub output_dir: PathBuf,
}

/// Which overlay renderer draws on each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayStyle {
    /// Plain text readouts.
    Basic,
    /// Watermark, g-meter, map, annotations and leaderboard.
    #[default]
    Track,
}

/// Overlay appearance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub style: OverlayStyle,

    /// TrueType font used for all overlay text. Text is skipped when unset.
    pub font_path: Option<PathBuf>,

    /// Watermark drawn in the bottom-left corner.
    pub watermark: String,

    /// Draw the mini-map.
    pub show_map: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "laprender=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

/// CLI arguments carried over between runs.
///
/// An argument given on the command line replaces the stored value; an
/// omitted one is filled in from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RememberedArgs {
    pub data_file: Option<PathBuf>,
    pub video_dir: Option<PathBuf>,
    pub recursive: Option<bool>,
    pub output_dir: Option<PathBuf>,
    pub track_name: Option<String>,
    pub bookend_secs: Option<u32>,
}

impl RememberedArgs {
    /// Store `given` when present, otherwise fall back to the stored value.
    pub fn recall<T: Clone>(slot: &mut Option<T>, given: Option<T>) -> Option<T> {
        match given {
            Some(value) => {
                *slot = Some(value.clone());
                Some(value)
            }
            None => slot.clone(),
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            bookend_secs: 8,
            queue_capacity: 100,
            progress_every_frames: 30,
            coarse_step_frames: 300,
            merge_window_secs: 3.0,
            output_dir: std::env::temp_dir(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            style: OverlayStyle::Track,
            font_path: None,
            watermark: "Rendered by laprender".to_string(),
            show_map: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from `path`, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
        .join("laprender")
        .join("config.json")
}

/// Resolve an XDG base directory, falling back to `$HOME/<fallback>`.
pub(crate) fn xdg_dir(var: &str, fallback: &str) -> PathBuf {
    std::env::var(var).map(PathBuf::from).unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(fallback)
    })
}
