//! External tool execution: argument assembly, bounded subprocess runs, and
//! duration probing.
//!
//! Everything above this module talks to the [`AudioProcessor`] trait, so the
//! mixing pipeline can be driven by the real tool in production and by a
//! scripted stand-in in tests. The real implementation shells out to
//! ffmpeg/ffprobe with a wall-clock timeout per job and a global cap on
//! concurrent invocations.

use crate::config::{EncodeSettings, StudioConfig};
use crate::error::{MixError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Longest tool diagnostic carried into an error message.
const MAX_DIAGNOSTIC_CHARS: usize = 500;

// ── Job description ──────────────────────────────────────────────────────────

/// How the filter is handed to the tool.
#[derive(Debug, Clone)]
pub enum FilterSpec {
    /// Multi-input graph; the stream labelled `[out]` is mapped to the output.
    Complex(String),
    /// Single-stream filter chain.
    Chain(String),
}

/// One complete tool invocation: inputs, filter, and output encode.
#[derive(Debug, Clone)]
pub struct FilterJob {
    /// Input files, in the order the graph's `[N:a]` labels expect.
    pub inputs: Vec<PathBuf>,
    pub filter: FilterSpec,
    /// Args inserted between the filter and the encode settings, e.g. an
    /// output trim (`-t`).
    pub extra_args: Vec<String>,
    pub encode: EncodeSettings,
    pub output: PathBuf,
    /// Wall-clock budget; the process is killed when it runs over.
    pub timeout: Duration,
}

/// Build the complete tool argument list for a job.
/// Returns a `Vec<String>` ready for `Command::args(...)`.
pub fn build_args(job: &FilterJob) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    args.push("-y".into());
    for input in &job.inputs {
        args.push("-i".into());
        args.push(input.to_string_lossy().into_owned());
    }

    match &job.filter {
        FilterSpec::Complex(graph) => {
            args.push("-filter_complex".into());
            args.push(graph.clone());
            args.push("-map".into());
            args.push("[out]".into());
        }
        FilterSpec::Chain(chain) => {
            args.push("-af".into());
            args.push(chain.clone());
        }
    }

    args.extend(job.extra_args.iter().cloned());

    args.push("-ac".into());
    args.push(job.encode.channels.to_string());
    args.push("-ar".into());
    args.push(job.encode.sample_rate.to_string());
    args.push("-codec:a".into());
    args.push(job.encode.codec.clone());
    args.push("-b:a".into());
    args.push(job.encode.bitrate.clone());

    args.push(job.output.to_string_lossy().into_owned());
    args
}

/// Trim a tool's stderr down to something an error message can carry.
fn truncate_diagnostic(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() {
        return "unknown error".to_string();
    }
    trimmed.chars().take(MAX_DIAGNOSTIC_CHARS).collect()
}

// ── The processor seam ───────────────────────────────────────────────────────

/// Boundary between the mixing pipeline and the external tool.
#[async_trait]
pub trait AudioProcessor: Send + Sync {
    /// Best-effort duration probe. Returns 0.0 whenever the duration cannot
    /// be determined; callers decide whether that is fatal.
    async fn probe_duration(&self, path: &Path) -> f64;

    /// Run one filter job to completion within its timeout.
    async fn run_filter_graph(&self, job: &FilterJob) -> Result<()>;
}

// ── Real tool runner ─────────────────────────────────────────────────────────

/// Runs jobs through the configured ffmpeg/ffprobe binaries.
pub struct FfmpegProcessor {
    ffmpeg: String,
    ffprobe: String,
    probe_timeout: Duration,
    jobs: Arc<Semaphore>,
}

impl FfmpegProcessor {
    pub fn new(config: &StudioConfig) -> Self {
        FfmpegProcessor {
            ffmpeg: config.ffmpeg.clone(),
            ffprobe: config.ffprobe.clone(),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            jobs: Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1))),
        }
    }
}

#[async_trait]
impl AudioProcessor for FfmpegProcessor {
    async fn probe_duration(&self, path: &Path) -> f64 {
        let probe = Command::new(&self.ffprobe)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(Ok(output)) if output.status.success() => {
                let text = String::from_utf8_lossy(&output.stdout);
                match text.trim().parse::<f64>() {
                    Ok(secs) => secs,
                    Err(_) => {
                        warn!("unparseable probe output for {}: {:?}", path.display(), text.trim());
                        0.0
                    }
                }
            }
            Ok(Ok(output)) => {
                warn!(
                    "probe of {} exited with {}",
                    path.display(),
                    output.status.code().unwrap_or(-1)
                );
                0.0
            }
            Ok(Err(e)) => {
                warn!("could not launch {}: {}", self.ffprobe, e);
                0.0
            }
            Err(_) => {
                warn!("probe of {} timed out", path.display());
                0.0
            }
        }
    }

    async fn run_filter_graph(&self, job: &FilterJob) -> Result<()> {
        let _permit = self
            .jobs
            .acquire()
            .await
            .map_err(|_| MixError::Internal("job semaphore closed".to_string()))?;

        let args = build_args(job);
        debug!("running {} {}", self.ffmpeg, args.join(" "));

        let child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MixError::ToolUnavailable(format!("could not launch {}: {}", self.ffmpeg, e))
            })?;

        // The tool is running from here on and may write the output file;
        // failures past this point must map to sweepable variants.
        let output = match tokio::time::timeout(job.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(MixError::ProcessFailed(format!(
                    "could not collect tool output: {}",
                    e
                )));
            }
            // kill_on_drop reaps the child when the elapsed future is dropped
            Err(_) => return Err(MixError::ProcessTimeout(job.timeout.as_secs())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MixError::ProcessFailed(truncate_diagnostic(&stderr)));
        }
        Ok(())
    }
}

// ── Scripted stand-in ────────────────────────────────────────────────────────

/// What a [`ScriptedProcessor`] does when handed a job.
#[derive(Debug, Clone)]
pub enum ScriptedRun {
    /// Write a placeholder output file and report success.
    Succeed,
    /// Fail with the given tool diagnostic, optionally leaving a partial
    /// output file behind the way a crashed tool would.
    Fail { stderr: String, leaves_partial: bool },
    /// Never finish; the job runs into its timeout.
    Hang,
    /// Refuse to start, like a missing binary; touches nothing.
    Unlaunchable,
}

impl Default for ScriptedRun {
    fn default() -> Self {
        ScriptedRun::Succeed
    }
}

/// Stand-in processor for exercising the pipeline without the real tool.
///
/// Probes answer from a scripted path→duration table (unknown paths probe as
/// 0.0, like a real failed probe), runs follow the configured [`ScriptedRun`],
/// and every job is recorded for assertions.
#[derive(Default)]
pub struct ScriptedProcessor {
    durations: Mutex<HashMap<PathBuf, f64>>,
    behavior: Mutex<ScriptedRun>,
    recorded: Mutex<Vec<FilterJob>>,
}

impl ScriptedProcessor {
    pub fn new() -> Self {
        ScriptedProcessor::default()
    }

    pub fn set_duration(&self, path: impl Into<PathBuf>, secs: f64) {
        self.durations.lock().unwrap().insert(path.into(), secs);
    }

    pub fn set_behavior(&self, behavior: ScriptedRun) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Every job run so far, oldest first.
    pub fn jobs(&self) -> Vec<FilterJob> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn last_job(&self) -> Option<FilterJob> {
        self.recorded.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AudioProcessor for ScriptedProcessor {
    async fn probe_duration(&self, path: &Path) -> f64 {
        self.durations.lock().unwrap().get(path).copied().unwrap_or(0.0)
    }

    async fn run_filter_graph(&self, job: &FilterJob) -> Result<()> {
        self.recorded.lock().unwrap().push(job.clone());
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            ScriptedRun::Succeed => {
                fs::write(&job.output, b"scripted audio")?;
                // the output now probes like a finished clip
                Ok(())
            }
            ScriptedRun::Fail { stderr, leaves_partial } => {
                if leaves_partial {
                    fs::write(&job.output, b"partial")?;
                }
                Err(MixError::ProcessFailed(truncate_diagnostic(&stderr)))
            }
            ScriptedRun::Hang => {
                let stuck = tokio::time::sleep(Duration::from_secs(86_400));
                match tokio::time::timeout(job.timeout, stuck).await {
                    Ok(()) => Err(MixError::Internal("scripted hang woke up".to_string())),
                    Err(_) => Err(MixError::ProcessTimeout(job.timeout.as_secs())),
                }
            }
            ScriptedRun::Unlaunchable => Err(MixError::ToolUnavailable(
                "could not launch ffmpeg: No such file or directory".to_string(),
            )),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
