//! Named-asset resolution: music beds and stock sounds.
//!
//! Callers refer to assets by bare name ("Cool Vibes"), by file name
//! ("Cool Vibes.mp3"), or by absolute path; resolution tries each form
//! against the configured library directory.

use crate::config::StudioConfig;
use crate::error::{MixError, Result};
use std::path::{Path, PathBuf};

/// Suffixes tried when resolving a name, in order. The empty suffix matches
/// names that already carry their extension.
const RESOLVE_EXTENSIONS: &[&str] = &["", ".mp3", ".wav", ".m4a"];

/// The studio's asset directories.
#[derive(Debug, Clone)]
pub struct AssetLibrary {
    music_dir: PathBuf,
    sounds_dir: PathBuf,
}

impl AssetLibrary {
    pub fn new(config: &StudioConfig) -> Self {
        AssetLibrary {
            music_dir: config.music_dir.clone(),
            sounds_dir: config.sounds_dir.clone(),
        }
    }

    pub fn with_dirs(music_dir: impl Into<PathBuf>, sounds_dir: impl Into<PathBuf>) -> Self {
        AssetLibrary {
            music_dir: music_dir.into(),
            sounds_dir: sounds_dir.into(),
        }
    }

    /// Resolve a background music bed by name.
    pub fn resolve_music(&self, name: &str) -> Result<PathBuf> {
        resolve_in(&self.music_dir, name)
            .ok_or_else(|| MixError::AssetNotFound(format!("music file '{}'", name)))
    }

    /// Resolve a stock sound (announcement chimes and the like) by name.
    pub fn resolve_sound(&self, name: &str) -> Result<PathBuf> {
        resolve_in(&self.sounds_dir, name)
            .ok_or_else(|| MixError::AssetNotFound(format!("sound file '{}'", name)))
    }
}

/// Absolute existing paths win; otherwise the name is joined onto `dir` with
/// each candidate suffix until something exists.
fn resolve_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.is_absolute() && direct.exists() {
        return Some(direct.to_path_buf());
    }
    for ext in RESOLVE_EXTENSIONS {
        let candidate = dir.join(format!("{}{}", name, ext));
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}
