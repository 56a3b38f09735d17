//! Integration tests for the jingle mixing pipeline.
//!
//! These drive `JingleMixer` end-to-end through the `ScriptedProcessor`, so
//! every code path runs without ffmpeg installed: asset resolution, timeline
//! math, graph synthesis, job assembly, failure mapping, and cleanup.

use jinglesmith::config::StudioConfig;
use jinglesmith::jingle::{JingleMixer, DEFAULT_INTRO_CHIME, DEFAULT_OUTRO_CHIME};
use jinglesmith::mix::{MixConfig, MixOverrides};
use jinglesmith::processor::{FilterSpec, ScriptedProcessor, ScriptedRun};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Studio layout on disk: music/, sounds/, audio/ under one temp root.
fn studio() -> (tempfile::TempDir, StudioConfig) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StudioConfig::default();
    config.music_dir = dir.path().join("music");
    config.sounds_dir = dir.path().join("sounds");
    config.audio_dir = dir.path().join("audio");
    fs::create_dir_all(&config.music_dir).unwrap();
    fs::create_dir_all(&config.sounds_dir).unwrap();
    fs::create_dir_all(&config.audio_dir).unwrap();
    (dir, config)
}

fn write_fake(path: &PathBuf) {
    fs::write(path, b"fake audio").unwrap();
}

fn complex_graph(filter: &FilterSpec) -> String {
    match filter {
        FilterSpec::Complex(graph) => graph.clone(),
        other => panic!("expected a complex graph, got {:?}", other),
    }
}

// ── Jingle mixing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn ducked_jingle_end_to_end() {
    let (dir, config) = studio();
    let music = config.music_dir.join("Cool Vibes.mp3");
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("jingle.mp3");
    write_fake(&music);
    write_fake(&speech);

    let processor = ScriptedProcessor::new();
    processor.set_duration(&speech, 5.0);
    processor.set_duration(&output, 16.5);
    let mixer = JingleMixer::new(processor, &config);

    let result = mixer
        .create_jingle(&speech, "Cool Vibes", &output, &MixConfig::default())
        .await;

    assert!(result.success);
    assert_eq!(result.duration, Some(16.5));
    assert!(result.error.is_none());
    assert!(output.exists());

    let jobs = mixer.processor().jobs();
    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(job.inputs, vec![music, speech]);
    assert_eq!(job.extra_args, vec!["-t", "16.5"]);
    assert_eq!(job.timeout, Duration::from_secs(120));

    // 5s of speech under the stock profile: total 16.5s, speech at 7s,
    // fade-out from 12s, music ducked to the 5% threshold.
    let graph = complex_graph(&job.filter);
    assert!(graph.contains("aloop=loop=-1"));
    assert!(graph.contains("atrim=0:16.5"));
    assert!(graph.contains("adelay=7000|7000"));
    assert!(graph.contains("apad=whole_dur=16.5"));
    assert!(graph.contains("sidechaincompress=threshold=0.050:ratio=6:attack=5:release=200:makeup=1.0"));
    assert!(graph.contains("afade=t=in:d=1.5"));
    assert!(graph.contains("afade=t=out:st=12.0:d=4.5"));
    assert!(graph.ends_with("amix=inputs=2:duration=longest:dropout_transition=3[out]"));
}

#[tokio::test]
async fn ducking_disabled_uses_flat_bed() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("jingle.mp3");
    write_fake(&config.music_dir.join("Bed.mp3"));
    write_fake(&speech);

    let processor = ScriptedProcessor::new();
    processor.set_duration(&speech, 5.0);
    let mixer = JingleMixer::new(processor, &config);

    let mut mix_config = MixConfig::default();
    mix_config.ducking_enabled = false;
    let result = mixer.create_jingle(&speech, "Bed", &output, &mix_config).await;

    assert!(result.success);
    let graph = complex_graph(&mixer.processor().last_job().unwrap().filter);
    assert!(!graph.contains("sidechaincompress"));
    assert!(!graph.contains("asplit"));
    assert!(graph.contains("amix=inputs=2"));
}

#[tokio::test]
async fn overrides_shape_the_mix() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("jingle.mp3");
    write_fake(&config.music_dir.join("Bed.mp3"));
    write_fake(&speech);

    let processor = ScriptedProcessor::new();
    processor.set_duration(&speech, 5.0);
    let mixer = JingleMixer::new(processor, &config);

    let overrides = MixOverrides {
        duck_level: Some(0.5),
        intro_silence: Some(2.0),
        ..MixOverrides::default()
    };
    let mix_config = MixConfig::default().with_overrides(&overrides).unwrap();
    let result = mixer.create_jingle(&speech, "Bed", &output, &mix_config).await;

    assert!(result.success);
    let job = mixer.processor().last_job().unwrap();
    // 2 + 5 + 4.5 seconds
    assert_eq!(job.extra_args, vec!["-t", "11.5"]);
    let graph = complex_graph(&job.filter);
    assert!(graph.contains("adelay=2000|2000"));
    assert!(graph.contains("threshold=0.500"));
}

#[tokio::test]
async fn repeated_mixes_plan_identically() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("jingle.mp3");
    write_fake(&config.music_dir.join("Bed.mp3"));
    write_fake(&speech);

    let processor = ScriptedProcessor::new();
    processor.set_duration(&speech, 5.0);
    processor.set_duration(&output, 16.5);
    let mixer = JingleMixer::new(processor, &config);

    let first = mixer
        .create_jingle(&speech, "Bed", &output, &MixConfig::default())
        .await;
    let second = mixer
        .create_jingle(&speech, "Bed", &output, &MixConfig::default())
        .await;

    assert!(first.success && second.success);
    assert_eq!(first.duration, second.duration);
    let jobs = mixer.processor().jobs();
    assert_eq!(jobs.len(), 2);
    assert_eq!(complex_graph(&jobs[0].filter), complex_graph(&jobs[1].filter));
    assert_eq!(jobs[0].extra_args, jobs[1].extra_args);
}

#[tokio::test]
async fn missing_music_fails_without_output() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("jingle.mp3");
    write_fake(&speech);

    let processor = ScriptedProcessor::new();
    processor.set_duration(&speech, 5.0);
    let mixer = JingleMixer::new(processor, &config);

    let result = mixer
        .create_jingle(&speech, "Cool Vibes", &output, &MixConfig::default())
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("music file 'Cool Vibes' not found")
    );
    assert!(!output.exists());
    assert!(mixer.processor().jobs().is_empty());
}

#[tokio::test]
async fn unreadable_speech_fails_before_running_the_tool() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("jingle.mp3");
    write_fake(&config.music_dir.join("Bed.mp3"));
    write_fake(&speech);

    // speech exists on disk but its duration cannot be probed
    let processor = ScriptedProcessor::new();
    let mixer = JingleMixer::new(processor, &config);

    let result = mixer
        .create_jingle(&speech, "Bed", &output, &MixConfig::default())
        .await;

    assert!(!result.success);
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("could not determine audio duration"));
    assert!(!output.exists());
    assert!(mixer.processor().jobs().is_empty());
}

#[tokio::test]
async fn invalid_settings_are_rejected_before_any_work() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("jingle.mp3");
    write_fake(&config.music_dir.join("Bed.mp3"));
    write_fake(&speech);

    let processor = ScriptedProcessor::new();
    processor.set_duration(&speech, 5.0);
    let mixer = JingleMixer::new(processor, &config);

    let mut mix_config = MixConfig::default();
    mix_config.duck_level = 1.5;
    let result = mixer.create_jingle(&speech, "Bed", &output, &mix_config).await;

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("duck_level"));
    assert!(mixer.processor().jobs().is_empty());
}

// ── Tool failure handling ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn stuck_tool_is_killed_and_reported() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("jingle.mp3");
    write_fake(&config.music_dir.join("Bed.mp3"));
    write_fake(&speech);

    let processor = ScriptedProcessor::new();
    processor.set_duration(&speech, 5.0);
    processor.set_behavior(ScriptedRun::Hang);
    let mixer = JingleMixer::new(processor, &config);

    let result = mixer
        .create_jingle(&speech, "Bed", &output, &MixConfig::default())
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("audio processing timed out after 120s")
    );
    assert!(!output.exists());
}

#[tokio::test]
async fn failed_tool_leaves_no_partial_output() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("jingle.mp3");
    write_fake(&config.music_dir.join("Bed.mp3"));
    write_fake(&speech);

    let processor = ScriptedProcessor::new();
    processor.set_duration(&speech, 5.0);
    processor.set_behavior(ScriptedRun::Fail {
        stderr: "Error initializing filter 'sidechaincompress'".to_string(),
        leaves_partial: true,
    });
    let mixer = JingleMixer::new(processor, &config);

    let result = mixer
        .create_jingle(&speech, "Bed", &output, &MixConfig::default())
        .await;

    assert!(!result.success);
    let message = result.error.as_deref().unwrap();
    assert!(message.contains("audio processing failed"));
    assert!(message.contains("sidechaincompress"));
    // the partial file the "tool" wrote has been swept up
    assert!(!output.exists());
}

#[tokio::test]
async fn launch_failure_leaves_existing_output_untouched() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("jingle.mp3");
    write_fake(&config.music_dir.join("Bed.mp3"));
    write_fake(&speech);
    // a clip from an earlier run already sits at the output path
    write_fake(&output);

    let processor = ScriptedProcessor::new();
    processor.set_duration(&speech, 5.0);
    processor.set_behavior(ScriptedRun::Unlaunchable);
    let mixer = JingleMixer::new(processor, &config);

    let result = mixer
        .create_jingle(&speech, "Bed", &output, &MixConfig::default())
        .await;

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("could not launch"));
    // the tool never ran; the earlier clip survives
    assert_eq!(fs::read(&output).unwrap(), b"fake audio");
}

// ── Announcement chimes ───────────────────────────────────────────────────

#[tokio::test]
async fn announcement_wrap_end_to_end() {
    let (dir, config) = studio();
    let intro = config.sounds_dir.join(DEFAULT_INTRO_CHIME);
    let outro = config.sounds_dir.join(DEFAULT_OUTRO_CHIME);
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("announce.mp3");
    write_fake(&intro);
    write_fake(&outro);
    write_fake(&speech);

    let processor = ScriptedProcessor::new();
    processor.set_duration(&output, 15.0);
    let mixer = JingleMixer::new(processor, &config);

    let result = mixer
        .add_announcement_sounds(&speech, &output, None, None)
        .await;

    assert!(result.success);
    assert_eq!(result.duration, Some(15.0));
    assert!(output.exists());

    let job = mixer.processor().last_job().unwrap();
    assert_eq!(job.inputs, vec![intro, speech, outro]);
    assert!(job.extra_args.is_empty());
    assert_eq!(job.timeout, Duration::from_secs(60));
    assert_eq!(
        complex_graph(&job.filter),
        "[0:a][1:a][2:a]concat=n=3:v=0:a=1[out]"
    );
}

#[tokio::test]
async fn announcement_with_named_chimes() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("announce.mp3");
    write_fake(&config.sounds_dir.join("station_in.mp3"));
    write_fake(&config.sounds_dir.join("station_out.wav"));
    write_fake(&speech);

    let processor = ScriptedProcessor::new();
    let mixer = JingleMixer::new(processor, &config);

    let result = mixer
        .add_announcement_sounds(&speech, &output, Some("station_in"), Some("station_out"))
        .await;

    assert!(result.success);
    let job = mixer.processor().last_job().unwrap();
    assert_eq!(job.inputs[0].file_name().unwrap(), "station_in.mp3");
    assert_eq!(job.inputs[2].file_name().unwrap(), "station_out.wav");
}

#[tokio::test]
async fn missing_chime_is_reported() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("announce.mp3");
    write_fake(&speech);

    let mixer = JingleMixer::new(ScriptedProcessor::new(), &config);
    let result = mixer
        .add_announcement_sounds(&speech, &output, None, None)
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("sound file 'intro_announcement.mp3' not found")
    );
    assert!(!output.exists());
}

#[tokio::test]
async fn missing_speech_is_reported_for_announcements() {
    let (dir, config) = studio();
    write_fake(&config.sounds_dir.join(DEFAULT_INTRO_CHIME));
    write_fake(&config.sounds_dir.join(DEFAULT_OUTRO_CHIME));
    let speech = dir.path().join("no_such_speech.mp3");
    let output = config.audio_dir.join("announce.mp3");

    let mixer = JingleMixer::new(ScriptedProcessor::new(), &config);
    let result = mixer
        .add_announcement_sounds(&speech, &output, None, None)
        .await;

    assert!(!result.success);
    let message = result.error.as_deref().unwrap();
    assert!(message.contains("speech file"));
    assert!(message.contains("not found"));
    assert!(mixer.processor().jobs().is_empty());
}

// ── Gain adjustment ───────────────────────────────────────────────────────

#[tokio::test]
async fn gain_pass_reencodes_with_a_volume_chain() {
    let (dir, config) = studio();
    let input = dir.path().join("clip.mp3");
    let output = config.audio_dir.join("louder.mp3");
    write_fake(&input);

    let processor = ScriptedProcessor::new();
    let mixer = JingleMixer::new(processor, &config);

    let result = mixer.adjust_gain(&input, &output, -3.5).await;

    assert!(result.success);
    let job = mixer.processor().last_job().unwrap();
    assert_eq!(job.inputs, vec![input]);
    assert_eq!(job.timeout, Duration::from_secs(60));
    match &job.filter {
        FilterSpec::Chain(chain) => assert_eq!(chain, "volume=-3.50dB"),
        other => panic!("expected a filter chain, got {:?}", other),
    }
}

#[tokio::test]
async fn near_zero_gain_is_a_plain_copy() {
    let (dir, config) = studio();
    let input = dir.path().join("clip.mp3");
    let output = config.audio_dir.join("copy.mp3");
    write_fake(&input);

    let mixer = JingleMixer::new(ScriptedProcessor::new(), &config);
    let result = mixer.adjust_gain(&input, &output, 0.004).await;

    assert!(result.success);
    assert_eq!(fs::read(&output).unwrap(), b"fake audio");
    // no tool run at all
    assert!(mixer.processor().jobs().is_empty());
}

// ── Fallback delivery ─────────────────────────────────────────────────────

#[tokio::test]
async fn fallback_delivers_speech_when_mix_fails() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("delivered.mp3");
    write_fake(&speech);

    let processor = ScriptedProcessor::new();
    processor.set_duration(&speech, 5.0);
    processor.set_duration(&output, 5.0);
    let mixer = JingleMixer::new(processor, &config);

    let delivered = mixer
        .mix_or_fallback(&speech, "No Such Bed", &output, &MixConfig::default())
        .await
        .unwrap();

    assert!(!delivered.mixed);
    assert_eq!(delivered.duration, 5.0);
    assert!(delivered.mix_error.as_deref().unwrap().contains("not found"));
    // the unmixed speech went out as-is
    assert_eq!(fs::read(&output).unwrap(), b"fake audio");
}

#[tokio::test]
async fn fallback_prefers_the_real_mix() {
    let (dir, config) = studio();
    let speech = dir.path().join("speech.mp3");
    let output = config.audio_dir.join("delivered.mp3");
    write_fake(&config.music_dir.join("Bed.mp3"));
    write_fake(&speech);

    let processor = ScriptedProcessor::new();
    processor.set_duration(&speech, 5.0);
    processor.set_duration(&output, 16.5);
    let mixer = JingleMixer::new(processor, &config);

    let delivered = mixer
        .mix_or_fallback(&speech, "Bed", &output, &MixConfig::default())
        .await
        .unwrap();

    assert!(delivered.mixed);
    assert_eq!(delivered.duration, 16.5);
    assert!(delivered.mix_error.is_none());
    assert_eq!(mixer.processor().jobs().len(), 1);
}
