//! Filter graph synthesis for the external mixing tool.
//!
//! Builds the `-filter_complex` strings as pure functions of the mix config
//! and timeline, so every graph can be asserted in tests without touching a
//! real audio file. Input labels are positional: `[0:a]` is always the music
//! bed, `[1:a]` the speech, matching the input order the runner passes.
//!
//! Stream naming convention inside the graphs: `music_loop` is the trimmed
//! looped bed, `voice_pad` the delayed/padded speech, `music_final` the bed
//! after fades, `out` the mixed result.

use crate::config::SidechainSettings;
use crate::mix::MixConfig;
use crate::timeline::Timeline;

/// Sidechain threshold derived from the duck level.
///
/// A duck level of 0.95 means the bed should fall to ~5% under speech, so the
/// compressor threshold is the remaining fraction. Clamped away from 0 (the
/// tool rejects it) and from silence-only thresholds above 0.9.
pub fn duck_threshold(duck_level: f64) -> f64 {
    (1.0 - duck_level).clamp(0.01, 0.9)
}

/// Speech delay in whole milliseconds, one value per output channel.
fn delay_ms(config: &MixConfig) -> u64 {
    (config.intro_silence * 1000.0) as u64
}

/// Shared front of every jingle graph: loop the bed to cover the full clip,
/// set both volumes, and position the speech on the timeline.
fn bed_and_voice(config: &MixConfig, timeline: &Timeline) -> String {
    let ms = delay_ms(config);
    format!(
        "[0:a]aloop=loop=-1:size=2e+09,atrim=0:{total:.1},volume={mv:.2}[music_loop];\
         [1:a]adelay={ms}|{ms},volume={vv:.2},apad=whole_dur={total:.1}[voice_pad]",
        total = timeline.total_duration,
        mv = config.music_volume,
        vv = config.voice_volume,
        ms = ms,
    )
}

fn fades(config: &MixConfig, timeline: &Timeline) -> String {
    format!(
        "afade=t=in:d={fi:.1},afade=t=out:st={fos:.1}:d={fo:.1}",
        fi = config.fade_in,
        fos = timeline.fade_out_start,
        fo = config.fade_out,
    )
}

/// Full ducked jingle graph: the padded speech is split into an audible copy
/// and a detector copy, the detector drives a sidechain compressor on the
/// bed, fades are applied to the compressed bed, and the two are mixed.
pub fn ducked_mix(
    config: &MixConfig,
    timeline: &Timeline,
    sidechain: &SidechainSettings,
) -> String {
    format!(
        "{front};\
         [voice_pad]asplit=2[vo][vd];\
         [music_loop][vd]sidechaincompress=threshold={th:.3}:ratio={ratio}:attack={attack}:release={release}:makeup={makeup:.1}[music_ducked];\
         [music_ducked]{fades}[music_final];\
         [music_final][vo]amix=inputs=2:duration=longest:dropout_transition=3[out]",
        front = bed_and_voice(config, timeline),
        th = duck_threshold(config.duck_level),
        ratio = sidechain.ratio,
        attack = sidechain.attack_ms,
        release = sidechain.release_ms,
        makeup = sidechain.makeup,
        fades = fades(config, timeline),
    )
}

/// Jingle graph without ducking: same layout and fades, music held at a
/// constant level under the speech.
pub fn simple_mix(config: &MixConfig, timeline: &Timeline) -> String {
    format!(
        "{front};\
         [music_loop]{fades}[music_final];\
         [music_final][voice_pad]amix=inputs=2:duration=longest:dropout_transition=3[out]",
        front = bed_and_voice(config, timeline),
        fades = fades(config, timeline),
    )
}

/// Back-to-back concatenation of `inputs` audio streams, re-encoded as one.
pub fn concat(inputs: usize) -> String {
    let mut graph = String::new();
    for i in 0..inputs {
        graph.push_str(&format!("[{}:a]", i));
    }
    graph.push_str(&format!("concat=n={}:v=0:a=1[out]", inputs));
    graph
}

/// Single-stream gain adjustment in decibels, for `-af` rather than
/// `-filter_complex`.
pub fn gain(gain_db: f64) -> String {
    format!("volume={:.2}dB", gain_db)
}
