//! Error types for the mixing engine.
//!
//! Every variant here terminates at the `JingleMixer` boundary, where it is
//! converted into a `MixResult { success: false, .. }`. Callers decide
//! whether a failed mix is fatal or whether to fall back to the unmixed
//! speech audio.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MixError {
    /// A named music/chime/speech asset could not be located on disk.
    /// Terminal and non-retryable.
    #[error("{0} not found")]
    AssetNotFound(String),

    /// Duration extraction failed or returned a non-positive value for a
    /// required input. A zero-length timeline would collapse all fade and
    /// ducking math, so this is a hard failure.
    #[error("could not determine audio duration of '{0}'")]
    ProbeFailed(String),

    /// The external audio tool exceeded its wall-clock budget and was killed.
    #[error("audio processing timed out after {0}s")]
    ProcessTimeout(u64),

    /// The external audio tool ran and failed: non-zero exit, or its output
    /// could not be collected. Carries at most the first 500 chars of its
    /// diagnostic output.
    #[error("audio processing failed: {0}")]
    ProcessFailed(String),

    /// The external audio tool could not be started at all (missing binary,
    /// bad path). It never ran and cannot have written an output file.
    #[error("audio processing failed: {0}")]
    ToolUnavailable(String),

    /// Mix settings rejected at construction time.
    #[error("invalid mix settings: {0}")]
    InvalidConfig(String),

    /// File I/O around the mix (copying fallbacks, cleaning partial output).
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Local monitoring playback could not be started.
    #[error("audio playback failed: {0}")]
    Playback(String),

    /// Catch-all for failures with no better home; the boundary still maps
    /// it to a result.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using [`MixError`].
pub type Result<T> = std::result::Result<T, MixError>;
