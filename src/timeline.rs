//! Mix timeline arithmetic.
//!
//! One jingle is laid out as: intro silence (music only), the speech, then
//! outro silence (music only), with the bed fading in at the start and out at
//! the end. Everything downstream (filter synthesis, output trimming) reads
//! these four numbers instead of redoing the math.

use crate::mix::MixConfig;

/// Key instants of one jingle, all in seconds from the start of the clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    /// Length of the speech recording itself.
    pub speech_duration: f64,
    /// Instant the speech ends: intro silence + speech.
    pub speech_end: f64,
    /// Full clip length: speech end + outro silence.
    pub total_duration: f64,
    /// Instant the closing fade begins. Never before the speech ends; a fade
    /// longer than the outro shortens itself rather than the voice.
    pub fade_out_start: f64,
}

impl Timeline {
    pub fn for_speech(speech_duration: f64, config: &MixConfig) -> Self {
        let speech_end = config.intro_silence + speech_duration;
        let total_duration = speech_end + config.outro_silence;
        let fade_out_start = (total_duration - config.fade_out).max(speech_end);
        Timeline {
            speech_duration,
            speech_end,
            total_duration,
            fade_out_start,
        }
    }
}
