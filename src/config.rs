//! TOML configuration with environment-variable overrides.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::defaults;
use crate::error::{DrumlineError, Result};

/// Detection-chain parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Lower band-pass cutoff in Hz.
    pub band_low_hz: f64,
    /// Upper band-pass cutoff in Hz.
    pub band_high_hz: f64,
    /// Butterworth order per band edge.
    pub filter_order: usize,
    /// Per-sample envelope retention factor, in (0, 1).
    pub decay_factor: f32,
    /// Median smoother width in samples.
    pub smoothing_window: usize,
    /// Hysteresis band height for the level detector.
    pub hysteresis_threshold: f32,
    /// Rate the stream is decimated toward before filtering, in Hz.
    pub target_sample_rate: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            band_low_hz: defaults::BAND_LOW_HZ,
            band_high_hz: defaults::BAND_HIGH_HZ,
            filter_order: defaults::FILTER_ORDER,
            decay_factor: defaults::DECAY_FACTOR,
            smoothing_window: defaults::SMOOTHING_WINDOW,
            hysteresis_threshold: defaults::HYSTERESIS_THRESHOLD,
            target_sample_rate: defaults::TARGET_SAMPLE_RATE,
        }
    }
}

impl DetectorConfig {
    /// Checks every rate-independent constraint. The band edges are also
    /// checked against the effective Nyquist rate when a pipeline locks
    /// onto its first chunk.
    pub fn validate(&self) -> Result<()> {
        if !(self.band_low_hz > 0.0) {
            return Err(invalid("band_low_hz", "must be positive"));
        }
        if self.band_high_hz <= self.band_low_hz {
            return Err(invalid("band_high_hz", "must be above band_low_hz"));
        }
        if self.filter_order == 0 {
            return Err(invalid("filter_order", "must be at least 1"));
        }
        if !(self.decay_factor > 0.0 && self.decay_factor < 1.0) {
            return Err(invalid("decay_factor", "must be strictly between 0 and 1"));
        }
        if self.smoothing_window == 0 {
            return Err(invalid("smoothing_window", "must be at least 1"));
        }
        if !(self.hysteresis_threshold > 0.0) {
            return Err(invalid("hysteresis_threshold", "must be positive"));
        }
        if !(self.target_sample_rate > 0.0) {
            return Err(invalid("target_sample_rate", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> DrumlineError {
    DrumlineError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Substring match against input device names; `None` picks the
    /// system default.
    pub device: Option<String>,
    /// Capture chunk length in milliseconds.
    pub chunk_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            chunk_ms: defaults::CHUNK_MS,
        }
    }
}

/// Event-streaming server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP listen address for `drumline serve`.
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: defaults::SERVE_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detector: DetectorConfig,
    pub audio: AudioConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Loads a TOML config file.
    ///
    /// # Errors
    /// `ConfigFileNotFound` if the path does not exist, `Config` on
    /// malformed TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DrumlineError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                DrumlineError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.detector.validate()?;
        Ok(config)
    }

    /// Loads the default config file if it exists, otherwise built-in
    /// defaults.
    pub fn load_or_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Applies `DRUMLINE_*` environment variables on top of the loaded
    /// values. Unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<f64>("DRUMLINE_BAND_LOW_HZ") {
            self.detector.band_low_hz = v;
        }
        if let Some(v) = env_parse::<f64>("DRUMLINE_BAND_HIGH_HZ") {
            self.detector.band_high_hz = v;
        }
        if let Some(v) = env_parse::<usize>("DRUMLINE_FILTER_ORDER") {
            self.detector.filter_order = v;
        }
        if let Some(v) = env_parse::<f32>("DRUMLINE_DECAY_FACTOR") {
            self.detector.decay_factor = v;
        }
        if let Some(v) = env_parse::<usize>("DRUMLINE_SMOOTHING_WINDOW") {
            self.detector.smoothing_window = v;
        }
        if let Some(v) = env_parse::<f32>("DRUMLINE_THRESHOLD") {
            self.detector.hysteresis_threshold = v;
        }
        if let Some(v) = env_parse::<f64>("DRUMLINE_TARGET_RATE") {
            self.detector.target_sample_rate = v;
        }
        if let Ok(v) = env::var("DRUMLINE_DEVICE") {
            self.audio.device = Some(v);
        }
        if let Ok(v) = env::var("DRUMLINE_SERVE_ADDR") {
            self.server.addr = v;
        }
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// `$XDG_CONFIG_HOME/drumline/config.toml` (or the platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("drumline").join("config.toml"))
}
