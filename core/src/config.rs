//! Audio configuration (~/.config/VcsAudio/config.toml)
//!
//! Handles loading, saving, and normalizing the settings that decide how a
//! fragment queue is built. Values outside the supported sets are reset to
//! their defaults on load, so a queue never sees an unsupported layout.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::queue::FragmentQueue;
use crate::stream::UnderrunPolicy;

/// Supported output sample rates
pub const SAMPLE_RATES: [u32; 3] = [44_100, 48_000, 96_000];
/// Supported fragment sizes (frames)
pub const FRAGMENT_SIZES: [u32; 6] = [128, 256, 512, 1024, 2048, 4096];
/// Largest accepted buffer size (fragments)
pub const MAX_BUFFER_SIZE: u32 = 20;
/// Largest accepted headroom (fragments)
pub const MAX_HEADROOM: u32 = 20;
/// Largest accepted volume (percent)
pub const MAX_VOLUME: u32 = 100;

/// Error type for explicit config file access
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Audio settings
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Bundled latency/quality trade-offs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Use the individual settings below
    Custom,
    LowQualityMediumLag,
    #[default]
    HighQualityMediumLag,
    HighQualityLowLag,
    VeryHighQualityVeryLowLag,
}

/// Resampling filter requested from the output stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResamplingQuality {
    NearestNeighbour,
    #[default]
    Lanczos2,
    Lanczos3,
}

/// Audio configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Whether audio output is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Output volume in percent (default: 80, range: 0-100)
    #[serde(default = "default_volume")]
    pub volume: u32,
    /// Preset (default: high_quality_medium_lag)
    #[serde(default)]
    pub preset: Preset,
    /// Sample rate in Hz, used with the custom preset (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Frames per fragment, used with the custom preset (default: 512)
    #[serde(default = "default_fragment_size")]
    pub fragment_size: u32,
    /// Fragments buffered for playback, used with the custom preset (default: 3, range: 0-20)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,
    /// Extra fragments absorbing producer jitter, used with the custom preset
    /// (default: 2, range: 0-20)
    #[serde(default = "default_headroom")]
    pub headroom: u32,
    /// Resampling quality, used with the custom preset (default: lanczos2)
    #[serde(default)]
    pub resampling_quality: ResamplingQuality,
    /// Stereo output (default: true)
    #[serde(default = "default_true")]
    pub stereo: bool,
    /// What to play when the queue runs dry (default: silence)
    #[serde(default)]
    pub underrun: UnderrunPolicy,
}

fn default_true() -> bool {
    true
}
fn default_volume() -> u32 {
    80
}
fn default_sample_rate() -> u32 {
    44_100
}
fn default_fragment_size() -> u32 {
    512
}
fn default_buffer_size() -> u32 {
    3
}
fn default_headroom() -> u32 {
    2
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            volume: default_volume(),
            preset: Preset::default(),
            sample_rate: default_sample_rate(),
            fragment_size: default_fragment_size(),
            buffer_size: default_buffer_size(),
            headroom: default_headroom(),
            resampling_quality: ResamplingQuality::default(),
            stereo: default_true(),
            underrun: UnderrunPolicy::default(),
        }
    }
}

/// Settings after the preset has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveAudio {
    pub sample_rate: u32,
    pub fragment_size: u32,
    pub buffer_size: u32,
    pub headroom: u32,
    pub resampling_quality: ResamplingQuality,
}

impl Preset {
    /// Fixed values for this preset, `None` for [`Preset::Custom`]
    pub fn values(self) -> Option<EffectiveAudio> {
        let (sample_rate, fragment_size, buffer_size, headroom, resampling_quality) = match self {
            Self::Custom => return None,
            Self::LowQualityMediumLag => (44_100, 1024, 6, 5, ResamplingQuality::NearestNeighbour),
            Self::HighQualityMediumLag => (44_100, 1024, 6, 5, ResamplingQuality::Lanczos2),
            Self::HighQualityLowLag => (48_000, 512, 3, 2, ResamplingQuality::Lanczos2),
            Self::VeryHighQualityVeryLowLag => (96_000, 128, 0, 0, ResamplingQuality::Lanczos3),
        };
        Some(EffectiveAudio {
            sample_rate,
            fragment_size,
            buffer_size,
            headroom,
            resampling_quality,
        })
    }
}

/// Everything needed to construct a [`FragmentQueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueParams {
    pub fragment_size: usize,
    pub capacity: usize,
    pub is_stereo: bool,
    pub sample_rate: u32,
}

impl QueueParams {
    pub fn build(self) -> FragmentQueue {
        FragmentQueue::new(self.fragment_size, self.capacity, self.is_stereo, self.sample_rate)
    }
}

impl AudioConfig {
    /// Reset unsupported values to their defaults.
    ///
    /// Returns one message per corrected field.
    pub fn normalize(&mut self) -> Vec<String> {
        let mut corrections = Vec::new();

        if !SAMPLE_RATES.contains(&self.sample_rate) {
            corrections.push(format!(
                "audio.sample_rate {} is not supported, using {}",
                self.sample_rate,
                default_sample_rate()
            ));
            self.sample_rate = default_sample_rate();
        }
        if !FRAGMENT_SIZES.contains(&self.fragment_size) {
            corrections.push(format!(
                "audio.fragment_size {} is not supported, using {}",
                self.fragment_size,
                default_fragment_size()
            ));
            self.fragment_size = default_fragment_size();
        }
        if self.buffer_size > MAX_BUFFER_SIZE {
            corrections.push(format!(
                "audio.buffer_size {} exceeds {}, using {}",
                self.buffer_size,
                MAX_BUFFER_SIZE,
                default_buffer_size()
            ));
            self.buffer_size = default_buffer_size();
        }
        if self.headroom > MAX_HEADROOM {
            corrections.push(format!(
                "audio.headroom {} exceeds {}, using {}",
                self.headroom,
                MAX_HEADROOM,
                default_headroom()
            ));
            self.headroom = default_headroom();
        }
        if self.volume > MAX_VOLUME {
            corrections.push(format!(
                "audio.volume {} exceeds {}, using {}",
                self.volume,
                MAX_VOLUME,
                default_volume()
            ));
            self.volume = default_volume();
        }

        corrections
    }

    /// Resolve the preset against the custom fields
    pub fn effective(&self) -> EffectiveAudio {
        self.preset.values().unwrap_or(EffectiveAudio {
            sample_rate: self.sample_rate,
            fragment_size: self.fragment_size,
            buffer_size: self.buffer_size,
            headroom: self.headroom,
            resampling_quality: self.resampling_quality,
        })
    }

    /// Queue layout for these settings.
    ///
    /// Capacity is buffer size plus headroom, at least one fragment.
    pub fn queue_params(&self) -> QueueParams {
        let effective = self.effective();
        QueueParams {
            fragment_size: effective.fragment_size as usize,
            capacity: (effective.buffer_size + effective.headroom).max(1) as usize,
            is_stereo: self.stereo,
            sample_rate: effective.sample_rate,
        }
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\VcsAudio\config`
/// On macOS: `~/Library/Application Support/io.vcsaudio.VcsAudio`
/// On Linux: `~/.config/VcsAudio`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.vcsaudio", "", "VcsAudio")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from the platform config directory.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
/// Unsupported values are normalized and logged.
pub fn load() -> Config {
    config_dir()
        .and_then(|dir| load_from(&dir.join("config.toml")).ok())
        .unwrap_or_default()
}

/// Loads and normalizes the configuration at `path`.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    for correction in config.audio.normalize() {
        warn!("{}", correction);
    }
    Ok(config)
}

/// Saves the configuration to the platform config directory.
///
/// Creates the directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    match config_dir() {
        Some(dir) => save_to(config, &dir.join("config.toml")),
        None => Ok(()),
    }
}

/// Saves the configuration to `path`, creating parent directories.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(io_error)
}
