//! Studio-wide settings: storage directories, tool names, time budgets,
//! and the fixed output encode format.
//!
//! Loaded from a JSON file (missing file = defaults, corrupt file = warn and
//! start fresh), then overridden by `JINGLESMITH_*` environment variables.
//! None of this is per-request: request-level knobs live in [`crate::mix`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFIG_FILE: &str = "config.json";

/// Fixed output format applied to every produced clip.
/// Configurable constants, not request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeSettings {
    /// Output channel count (2 = stereo).
    #[serde(default = "default_channels")]
    pub channels: u8,
    /// Output sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Audio codec handed to the external tool.
    #[serde(default = "default_codec")]
    pub codec: String,
    /// Target bit rate (tool syntax, e.g. "192k").
    #[serde(default = "default_bitrate")]
    pub bitrate: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        EncodeSettings {
            channels: default_channels(),
            sample_rate: default_sample_rate(),
            codec: default_codec(),
            bitrate: default_bitrate(),
        }
    }
}

/// Sidechain compressor parameters for the ducked mix.
///
/// The threshold is not here: it is derived per-mix from the duck level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidechainSettings {
    #[serde(default = "default_ratio")]
    pub ratio: f64,
    #[serde(default = "default_attack_ms")]
    pub attack_ms: f64,
    #[serde(default = "default_release_ms")]
    pub release_ms: f64,
    #[serde(default = "default_makeup")]
    pub makeup: f64,
}

impl Default for SidechainSettings {
    fn default() -> Self {
        SidechainSettings {
            ratio: default_ratio(),
            attack_ms: default_attack_ms(),
            release_ms: default_release_ms(),
            makeup: default_makeup(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Directory holding background music beds.
    #[serde(default = "default_music_dir")]
    pub music_dir: PathBuf,
    /// Directory holding announcement chimes and other stock sounds.
    #[serde(default = "default_sounds_dir")]
    pub sounds_dir: PathBuf,
    /// Directory where produced clips land by default.
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
    /// Scratch space for intermediate files.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Name or path of the mixing tool binary.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    /// Name or path of the probing tool binary.
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,

    /// Wall-clock budget for a full mix (filter synthesis is expensive).
    #[serde(default = "default_mix_timeout")]
    pub mix_timeout_secs: u64,
    /// Wall-clock budget for chime concatenation and gain passes.
    #[serde(default = "default_concat_timeout")]
    pub concat_timeout_secs: u64,
    /// Wall-clock budget for a duration probe.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Upper bound on concurrent external tool invocations.
    #[serde(default = "default_max_jobs")]
    pub max_concurrent_jobs: usize,

    #[serde(default)]
    pub encode: EncodeSettings,
    #[serde(default)]
    pub sidechain: SidechainSettings,
}

impl Default for StudioConfig {
    fn default() -> Self {
        StudioConfig {
            music_dir: default_music_dir(),
            sounds_dir: default_sounds_dir(),
            audio_dir: default_audio_dir(),
            temp_dir: default_temp_dir(),
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            mix_timeout_secs: default_mix_timeout(),
            concat_timeout_secs: default_concat_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            max_concurrent_jobs: default_max_jobs(),
            encode: EncodeSettings::default(),
            sidechain: SidechainSettings::default(),
        }
    }
}

impl StudioConfig {
    /// Load settings from the default location, then apply environment
    /// overrides. Missing file means defaults; a corrupt file is reported
    /// and replaced by defaults rather than aborting.
    pub fn load() -> Self {
        let mut config = Self::load_from(&Self::default_path());
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load settings from an explicit file, without environment overrides.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(data) => match serde_json::from_str(&data) {
                    Ok(config) => return config,
                    Err(e) => warn!("corrupt config file {}, using defaults: {}", path.display(), e),
                },
                Err(e) => warn!("could not read config file {}: {}", path.display(), e),
            }
        }
        StudioConfig::default()
    }

    /// Persist settings to the default location, creating parent dirs.
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("Create dir error: {}", e))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| format!("Serialize error: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Write error: {}", e))?;
        Ok(())
    }

    /// Default config file location: the platform config dir, or the working
    /// directory when that is unavailable.
    pub fn default_path() -> PathBuf {
        match dirs::config_dir() {
            Some(base) => base.join("jinglesmith").join(CONFIG_FILE),
            None => PathBuf::from(CONFIG_FILE),
        }
    }

    /// Apply `JINGLESMITH_*` overrides from any key→value source.
    /// Separated from the environment itself so it can be tested directly.
    pub fn apply_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("JINGLESMITH_MUSIC_DIR") {
            self.music_dir = PathBuf::from(v);
        }
        if let Some(v) = get("JINGLESMITH_SOUNDS_DIR") {
            self.sounds_dir = PathBuf::from(v);
        }
        if let Some(v) = get("JINGLESMITH_AUDIO_DIR") {
            self.audio_dir = PathBuf::from(v);
        }
        if let Some(v) = get("JINGLESMITH_TEMP_DIR") {
            self.temp_dir = PathBuf::from(v);
        }
        if let Some(v) = get("JINGLESMITH_FFMPEG") {
            self.ffmpeg = v;
        }
        if let Some(v) = get("JINGLESMITH_FFPROBE") {
            self.ffprobe = v;
        }
    }
}

fn default_channels() -> u8 {
    2
}
fn default_sample_rate() -> u32 {
    44_100
}
fn default_codec() -> String {
    "libmp3lame".to_string()
}
fn default_bitrate() -> String {
    "192k".to_string()
}
fn default_ratio() -> f64 {
    6.0
}
fn default_attack_ms() -> f64 {
    5.0
}
fn default_release_ms() -> f64 {
    200.0
}
fn default_makeup() -> f64 {
    1.0
}
fn default_music_dir() -> PathBuf {
    PathBuf::from("storage/music")
}
fn default_sounds_dir() -> PathBuf {
    PathBuf::from("storage/sounds")
}
fn default_audio_dir() -> PathBuf {
    PathBuf::from("storage/audio")
}
fn default_temp_dir() -> PathBuf {
    PathBuf::from("storage/temp")
}
fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}
fn default_ffprobe() -> String {
    "ffprobe".to_string()
}
fn default_mix_timeout() -> u64 {
    120
}
fn default_concat_timeout() -> u64 {
    60
}
fn default_probe_timeout() -> u64 {
    30
}
fn default_max_jobs() -> usize {
    4
}
