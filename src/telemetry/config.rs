//! Configuration for the telemetry pipeline.
//!
//! Supports YAML configuration with precedence: CLI > file > defaults.
//! Every field is optional in the file; missing sections fall back to their
//! defaults.

use crate::telemetry::error::{Result, TelemetryError};
use crate::telemetry::series::Retention;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Diagnostic command settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Executable to run for each sample.
    #[serde(default = "default_command")]
    pub command: String,

    /// Extra arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,

    /// Upper bound on one invocation, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_command() -> String {
    "nvidia-smi".to_string()
}
fn default_timeout_ms() -> u64 {
    5000
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { command: default_command(), args: Vec::new(), timeout_ms: default_timeout_ms() }
    }
}

impl SamplerConfig {
    /// Returns the invocation timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Sampling schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Seconds between ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Number of most recent samples used for the temperature delta.
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,
}

fn default_interval_secs() -> u64 {
    1
}
fn default_rolling_window() -> usize {
    10
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { interval_secs: default_interval_secs(), rolling_window: default_rolling_window() }
    }
}

impl DriverConfig {
    /// Returns the tick interval as a Duration.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Sample retention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesConfig {
    /// Maximum retained samples; absent keeps everything.
    #[serde(default)]
    pub max_samples: Option<usize>,

    /// Maximum points handed to renderers per snapshot.
    #[serde(default)]
    pub view_points: Option<usize>,
}

impl SeriesConfig {
    /// Retention policy for the series store.
    #[must_use]
    pub fn retention(&self) -> Retention {
        Retention::from_max_samples(self.max_samples)
    }
}

/// Frame and video export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory receiving one PNG per tick.
    #[serde(default)]
    pub frames_dir: Option<PathBuf>,

    /// Path of the animated PNG written on shutdown.
    #[serde(default)]
    pub video_path: Option<PathBuf>,

    /// Playback rate of the animation.
    #[serde(default = "default_video_fps")]
    pub video_fps: u16,

    /// Finalize the animation after this many frames.
    #[serde(default)]
    pub frame_budget: Option<usize>,

    /// Dashboard width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Dashboard height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_video_fps() -> u16 {
    10
}
fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            frames_dir: None,
            video_path: None,
            video_fps: default_video_fps(),
            frame_budget: None,
            width: default_width(),
            height: default_height(),
        }
    }
}

/// HTTP probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Listen address, e.g. `127.0.0.1:9000`. Absent disables the probe.
    #[serde(default)]
    pub bind: Option<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Diagnostic command.
    #[serde(default)]
    pub sampler: SamplerConfig,

    /// Sampling schedule.
    #[serde(default)]
    pub driver: DriverConfig,

    /// Sample retention.
    #[serde(default)]
    pub series: SeriesConfig,

    /// Frame and video export.
    #[serde(default)]
    pub export: ExportConfig,

    /// HTTP probe.
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Default configuration path: `<config_dir>/smi-viz/config.yaml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("smi-viz").join("config.yaml"))
    }

    /// Loads and validates configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| TelemetryError::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parses and validates configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails, or
    /// [`TelemetryError::ConfigInvalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map(|l| l.line()).unwrap_or(0);
            TelemetryError::ConfigParse { line, message: e.to_string() }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::ConfigInvalid`] naming the first bad key.
    pub fn validate(&self) -> Result<()> {
        if self.driver.interval_secs == 0 {
            return Err(invalid("driver.interval_secs", "must be at least 1 second"));
        }
        if self.driver.rolling_window < 2 {
            return Err(invalid("driver.rolling_window", "must cover at least 2 samples"));
        }
        if self.sampler.timeout_ms == 0 {
            return Err(invalid("sampler.timeout_ms", "must be positive"));
        }
        if self.series.max_samples == Some(0) {
            return Err(invalid("series.max_samples", "must be positive when set"));
        }
        if self.series.view_points == Some(0) {
            return Err(invalid("series.view_points", "must be positive when set"));
        }
        if self.export.width == 0 || self.export.height == 0 {
            return Err(invalid("export.width/height", "dimensions must be non-zero"));
        }
        if self.export.video_fps == 0 {
            return Err(invalid("export.video_fps", "must be positive"));
        }
        if self.export.frame_budget == Some(0) {
            return Err(invalid("export.frame_budget", "must be positive when set"));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> TelemetryError {
    TelemetryError::ConfigInvalid { key: key.to_string(), message: message.to_string() }
}
