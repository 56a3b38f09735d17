//! The mixing orchestrator: turns a speech recording plus library assets
//! into finished broadcast clips.
//!
//! Every public operation returns a [`MixResult`] rather than an error;
//! production callers treat a failed mix as data (log it, fall back, retry
//! later), not as a reason to unwind. The external tool is only ever reached
//! through the [`AudioProcessor`] seam.

use crate::assets::AssetLibrary;
use crate::config::{EncodeSettings, SidechainSettings, StudioConfig};
use crate::error::{MixError, Result};
use crate::filter_graph;
use crate::mix::{MixConfig, MixResult};
use crate::processor::{AudioProcessor, FilterJob, FilterSpec};
use crate::timeline::Timeline;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Chime played before the speech when none is named.
pub const DEFAULT_INTRO_CHIME: &str = "intro_announcement.mp3";
/// Chime played after the speech when none is named.
pub const DEFAULT_OUTRO_CHIME: &str = "outro_announcement.mp3";

/// What a fallback-capable caller ends up with on disk.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveredAudio {
    /// True when the output is the full mix; false when it is the plain
    /// speech copied through after a failed mix.
    pub mixed: bool,
    pub duration: f64,
    /// The mix failure that forced the fallback, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mix_error: Option<String>,
}

pub struct JingleMixer<P: AudioProcessor> {
    processor: P,
    assets: AssetLibrary,
    encode: EncodeSettings,
    sidechain: SidechainSettings,
    mix_timeout: Duration,
    concat_timeout: Duration,
}

impl<P: AudioProcessor> JingleMixer<P> {
    pub fn new(processor: P, config: &StudioConfig) -> Self {
        JingleMixer {
            processor,
            assets: AssetLibrary::new(config),
            encode: config.encode.clone(),
            sidechain: config.sidechain.clone(),
            mix_timeout: Duration::from_secs(config.mix_timeout_secs),
            concat_timeout: Duration::from_secs(config.concat_timeout_secs),
        }
    }

    pub fn assets(&self) -> &AssetLibrary {
        &self.assets
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    // ── Jingle mixing ────────────────────────────────────────────────────────

    /// Mix a speech recording over a looped, ducked music bed.
    ///
    /// The speech is placed after `intro_silence` seconds of music, the bed
    /// is padded out for `outro_silence` more after it ends, and the whole
    /// clip is faded in and out. On any failure the output file is absent and
    /// the result carries the reason.
    pub async fn create_jingle(
        &self,
        speech: &Path,
        music_name: &str,
        output: &Path,
        config: &MixConfig,
    ) -> MixResult {
        match self.try_create_jingle(speech, music_name, output, config).await {
            Ok(duration) => MixResult::ok(duration),
            Err(e) => {
                warn!("jingle mix for {} failed: {}", speech.display(), e);
                MixResult::failed(&e)
            }
        }
    }

    async fn try_create_jingle(
        &self,
        speech: &Path,
        music_name: &str,
        output: &Path,
        config: &MixConfig,
    ) -> Result<f64> {
        let started = Instant::now();
        let config = config.clone().validated()?;

        let music = self.assets.resolve_music(music_name)?;
        let speech_duration = self.processor.probe_duration(speech).await;
        if speech_duration <= 0.0 {
            return Err(MixError::ProbeFailed(speech.display().to_string()));
        }

        let timeline = Timeline::for_speech(speech_duration, &config);
        info!("jingle timings: {}", timing_summary(&timeline));
        let graph = if config.ducking_enabled {
            filter_graph::ducked_mix(&config, &timeline, &self.sidechain)
        } else {
            filter_graph::simple_mix(&config, &timeline)
        };
        debug!("jingle graph: {}", graph);

        let job = FilterJob {
            inputs: vec![music, speech.to_path_buf()],
            filter: FilterSpec::Complex(graph),
            extra_args: vec!["-t".to_string(), format!("{:.1}", timeline.total_duration)],
            encode: self.encode.clone(),
            output: output.to_path_buf(),
            timeout: self.mix_timeout,
        };
        self.run_and_clean(&job).await?;

        let duration = self.probe_output(output).await;
        info!(
            "created jingle {} ({:.1}s speech -> {:.1}s clip) in {:.1}s",
            output.display(),
            speech_duration,
            timeline.total_duration,
            started.elapsed().as_secs_f64()
        );
        Ok(duration)
    }

    // ── Announcement chimes ──────────────────────────────────────────────────

    /// Wrap a speech recording in intro/outro chimes, back to back.
    ///
    /// `intro` and `outro` name sounds in the library; `None` picks the
    /// standard announcement chimes.
    pub async fn add_announcement_sounds(
        &self,
        speech: &Path,
        output: &Path,
        intro: Option<&str>,
        outro: Option<&str>,
    ) -> MixResult {
        match self.try_add_announcements(speech, output, intro, outro).await {
            Ok(duration) => MixResult::ok(duration),
            Err(e) => {
                warn!("announcement wrap for {} failed: {}", speech.display(), e);
                MixResult::failed(&e)
            }
        }
    }

    async fn try_add_announcements(
        &self,
        speech: &Path,
        output: &Path,
        intro: Option<&str>,
        outro: Option<&str>,
    ) -> Result<f64> {
        let started = Instant::now();
        if !speech.exists() {
            return Err(MixError::AssetNotFound(format!(
                "speech file '{}'",
                speech.display()
            )));
        }

        let intro = self
            .assets
            .resolve_sound(intro.unwrap_or(DEFAULT_INTRO_CHIME))?;
        let outro = self
            .assets
            .resolve_sound(outro.unwrap_or(DEFAULT_OUTRO_CHIME))?;

        // Absolute paths only: the tool's idea of the working directory is
        // not part of this contract.
        let inputs = vec![
            absolutize(&intro)?,
            absolutize(speech)?,
            absolutize(&outro)?,
        ];
        let job = FilterJob {
            inputs,
            filter: FilterSpec::Complex(filter_graph::concat(3)),
            extra_args: Vec::new(),
            encode: self.encode.clone(),
            output: absolutize(output)?,
            timeout: self.concat_timeout,
        };
        self.run_and_clean(&job).await?;

        let duration = self.probe_output(output).await;
        info!(
            "wrapped {} in announcement chimes ({:.1}s) in {:.1}s",
            speech.display(),
            duration,
            started.elapsed().as_secs_f64()
        );
        Ok(duration)
    }

    // ── Gain adjustment ──────────────────────────────────────────────────────

    /// Re-encode a clip with a flat gain change in dB. A near-zero change is
    /// a plain copy.
    pub async fn adjust_gain(&self, input: &Path, output: &Path, gain_db: f64) -> MixResult {
        match self.try_adjust_gain(input, output, gain_db).await {
            Ok(duration) => MixResult::ok(duration),
            Err(e) => {
                warn!("gain adjust for {} failed: {}", input.display(), e);
                MixResult::failed(&e)
            }
        }
    }

    async fn try_adjust_gain(&self, input: &Path, output: &Path, gain_db: f64) -> Result<f64> {
        if !input.exists() {
            return Err(MixError::AssetNotFound(format!(
                "audio file '{}'",
                input.display()
            )));
        }

        if gain_db.abs() < 0.01 {
            fs::copy(input, output)?;
            return Ok(self.probe_output(output).await);
        }

        let job = FilterJob {
            inputs: vec![input.to_path_buf()],
            filter: FilterSpec::Chain(filter_graph::gain(gain_db)),
            extra_args: Vec::new(),
            encode: self.encode.clone(),
            output: output.to_path_buf(),
            timeout: self.concat_timeout,
        };
        self.run_and_clean(&job).await?;

        let duration = self.probe_output(output).await;
        info!(
            "adjusted gain of {} by {:+.2} dB -> {}",
            input.display(),
            gain_db,
            output.display()
        );
        Ok(duration)
    }

    // ── Fallback delivery ────────────────────────────────────────────────────

    /// Mix a jingle, falling back to the unmixed speech when the mix fails.
    ///
    /// Air must go on: a broken music bed or a stuck tool still yields a
    /// playable file at `output`. Only a failure to copy the speech itself is
    /// an error.
    pub async fn mix_or_fallback(
        &self,
        speech: &Path,
        music_name: &str,
        output: &Path,
        config: &MixConfig,
    ) -> Result<DeliveredAudio> {
        let mix = self.create_jingle(speech, music_name, output, config).await;
        if mix.success {
            return Ok(DeliveredAudio {
                mixed: true,
                duration: mix.duration.unwrap_or(0.0),
                mix_error: None,
            });
        }

        warn!(
            "falling back to unmixed speech for {}: {}",
            speech.display(),
            mix.error.as_deref().unwrap_or("unknown error")
        );
        fs::copy(speech, output)?;
        let duration = self.processor.probe_duration(output).await;
        Ok(DeliveredAudio {
            mixed: false,
            duration,
            mix_error: mix.error,
        })
    }

    // ── Shared plumbing ──────────────────────────────────────────────────────

    /// Run a job, sweeping up whatever partial output a failed or killed tool
    /// left behind. The no-partial-output guarantee lives here.
    async fn run_and_clean(&self, job: &FilterJob) -> Result<()> {
        match self.processor.run_filter_graph(job).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let tool_wrote = matches!(
                    e,
                    MixError::ProcessFailed(_) | MixError::ProcessTimeout(_)
                );
                if tool_wrote && job.output.exists() {
                    if let Err(rm) = fs::remove_file(&job.output) {
                        warn!(
                            "could not remove partial output {}: {}",
                            job.output.display(),
                            rm
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Duration of a freshly produced file. A clip we just wrote but cannot
    /// probe is suspicious, not fatal.
    async fn probe_output(&self, output: &Path) -> f64 {
        let duration = self.processor.probe_duration(output).await;
        if duration <= 0.0 {
            warn!("produced {} but could not probe its duration", output.display());
        }
        duration
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// One-line timing summary for the job log, in clip order.
fn timing_summary(timeline: &Timeline) -> String {
    format!(
        "intro {:.1}s, speech end {:.1}s, total {:.1}s, fade out from {:.1}s",
        timeline.speech_end - timeline.speech_duration,
        timeline.speech_end,
        timeline.total_duration,
        timeline.fade_out_start
    )
}
