//! Produced-file inspection: size, duration, format properties, and tags.
//!
//! Works from the file alone, no external tool. Property reads degrade
//! gracefully: a file whose header cannot be parsed still reports its size,
//! with everything else absent.

use crate::error::Result;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::Accessor;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct AudioMetadata {
    pub path: PathBuf,
    pub file_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
}

impl AudioMetadata {
    /// Inspect an audio file on disk. Fails only when the file itself is
    /// unreadable; a bad header just leaves the property fields empty.
    pub fn read(path: &Path) -> Result<Self> {
        let file_size_bytes = fs::metadata(path)?.len();
        let mut meta = AudioMetadata {
            path: path.to_path_buf(),
            file_size_bytes,
            duration_secs: None,
            sample_rate: None,
            channels: None,
            bitrate_kbps: None,
            title: None,
            artist: None,
        };

        match lofty::read_from_path(path) {
            Ok(tagged_file) => {
                let properties = tagged_file.properties();
                let duration = properties.duration();
                if !duration.is_zero() {
                    meta.duration_secs = Some(duration.as_secs_f64());
                }
                meta.sample_rate = properties.sample_rate();
                meta.channels = properties.channels();
                meta.bitrate_kbps = properties
                    .audio_bitrate()
                    .or_else(|| estimate_bitrate_kbps(file_size_bytes, meta.duration_secs));

                let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
                meta.title = tag.and_then(|t| t.title().map(|s| s.to_string()));
                meta.artist = tag.and_then(|t| t.artist().map(|s| s.to_string()));
            }
            Err(e) => warn!("could not read audio properties of {}: {}", path.display(), e),
        }

        Ok(meta)
    }

    /// Format duration as MM:SS, or a placeholder when unknown.
    pub fn duration_display(&self) -> String {
        match self.duration_secs {
            Some(secs) => {
                let whole = secs as u64;
                format!("{}:{:02}", whole / 60, whole % 60)
            }
            None => "?:??".to_string(),
        }
    }
}

/// Rough bitrate from size over duration, when the header does not carry one.
fn estimate_bitrate_kbps(file_size_bytes: u64, duration_secs: Option<f64>) -> Option<u32> {
    let secs = duration_secs?;
    if secs <= 0.0 {
        return None;
    }
    Some((file_size_bytes as f64 * 8.0 / 1000.0 / secs).round() as u32)
}
