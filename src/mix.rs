//! Per-request mix parameters and the structured outcome type.
//!
//! [`MixConfig`] is the full knob set for one jingle; [`MixOverrides`] is the
//! sparse form callers send over the wire (per-voice presets, API bodies) and
//! is range-checked before it touches a config. [`MixResult`] is what every
//! mixing operation reports instead of panicking or leaking tool errors.

use crate::error::{MixError, Result};
use serde::{Deserialize, Serialize};

/// All knobs for a single jingle mix.
///
/// Volumes are linear multipliers (1.0 = unchanged). Durations are seconds.
/// `duck_level` is the fraction by which music drops under speech: 0.95 means
/// the bed falls to roughly 5% while the voice is talking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixConfig {
    pub music_volume: f64,
    pub voice_volume: f64,
    pub fade_in: f64,
    pub fade_out: f64,
    pub duck_level: f64,
    pub intro_silence: f64,
    pub outro_silence: f64,
    pub ducking_enabled: bool,
}

impl Default for MixConfig {
    fn default() -> Self {
        MixConfig {
            music_volume: 1.65,
            voice_volume: 2.8,
            fade_in: 1.5,
            fade_out: 4.5,
            duck_level: 0.95,
            intro_silence: 7.0,
            outro_silence: 4.5,
            ducking_enabled: true,
        }
    }
}

impl MixConfig {
    /// Merge sparse overrides onto this config, range-checking the result.
    pub fn with_overrides(&self, overrides: &MixOverrides) -> Result<Self> {
        overrides.apply(self)
    }

    /// Range-check the config, returning it unchanged on success.
    ///
    /// Bounds match what the override schema accepts; a config assembled any
    /// other way is held to the same rules.
    pub fn validated(self) -> Result<Self> {
        check_range("music_volume", self.music_volume, 0.0, 5.0)?;
        check_range("voice_volume", self.voice_volume, 0.0, 5.0)?;
        check_range("duck_level", self.duck_level, 0.0, 1.0)?;
        check_range("intro_silence", self.intro_silence, 0.0, 15.0)?;
        check_range("outro_silence", self.outro_silence, 0.0, 20.0)?;
        check_nonnegative("fade_in", self.fade_in)?;
        check_nonnegative("fade_out", self.fade_out)?;
        Ok(self)
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(MixError::InvalidConfig(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

fn check_nonnegative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(MixError::InvalidConfig(format!(
            "{} must be non-negative, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Sparse per-request overrides. Only the five fields a caller may vary;
/// unknown keys are rejected at parse time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MixOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duck_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_silence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro_silence: Option<f64>,
}

impl MixOverrides {
    pub fn is_empty(&self) -> bool {
        self.music_volume.is_none()
            && self.voice_volume.is_none()
            && self.duck_level.is_none()
            && self.intro_silence.is_none()
            && self.outro_silence.is_none()
    }

    /// Merge onto a base config, range-checking the result.
    pub fn apply(&self, base: &MixConfig) -> Result<MixConfig> {
        let mut config = base.clone();
        if let Some(v) = self.music_volume {
            config.music_volume = v;
        }
        if let Some(v) = self.voice_volume {
            config.voice_volume = v;
        }
        if let Some(v) = self.duck_level {
            config.duck_level = v;
        }
        if let Some(v) = self.intro_silence {
            config.intro_silence = v;
        }
        if let Some(v) = self.outro_silence {
            config.outro_silence = v;
        }
        config.validated()
    }
}

/// Outcome of a mixing operation, shaped for API responses and job logs.
///
/// Failures are data, not panics: `success == false` carries a message and
/// never a partial output file on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MixResult {
    pub fn ok(duration: f64) -> Self {
        MixResult {
            success: true,
            duration: Some(duration),
            error: None,
        }
    }

    pub fn failed(err: &MixError) -> Self {
        MixResult {
            success: false,
            duration: None,
            error: Some(err.to_string()),
        }
    }
}
