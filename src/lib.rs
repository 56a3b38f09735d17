//! jinglesmith — Core library for the broadcast jingle mixing engine.
//!
//! Speech recordings go in; finished clips come out: speech over a looped,
//! ducked music bed with fades and silence padding, or wrapped in
//! announcement chimes. All heavy lifting is delegated to an external
//! ffmpeg/ffprobe pair behind the [`processor::AudioProcessor`] seam.
//! The CLI consumes this crate.

pub mod assets;
pub mod config;
pub mod error;
pub mod filter_graph;
pub mod jingle;
pub mod metadata;
pub mod mix;
pub mod preview;
pub mod processor;
pub mod timeline;
