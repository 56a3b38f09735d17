//! Local playback of a produced clip, for checking a mix before it airs.
//!
//! Decodes in-process and blocks until the clip finishes. This is a
//! monitoring convenience, not part of the production pipeline.

use crate::error::{MixError, Result};
use rodio::{Decoder, OutputStream, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Play a file on the default audio output, blocking until it ends.
pub fn play_blocking(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(MixError::AssetNotFound(format!(
            "audio file '{}'",
            path.display()
        )));
    }

    let (_stream, handle) = OutputStream::try_default()
        .map_err(|e| MixError::Playback(format!("failed to open audio output: {}", e)))?;
    let sink = Sink::try_new(&handle)
        .map_err(|e| MixError::Playback(format!("failed to create audio sink: {}", e)))?;

    let file = File::open(path)?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| MixError::Playback(format!("cannot decode '{}': {}", path.display(), e)))?;

    info!("previewing {}", path.display());
    sink.append(source);
    sink.play();
    while !sink.empty() {
        std::thread::sleep(Duration::from_millis(100));
    }
    Ok(())
}
