use anyhow::Context;
use clap::{Parser, Subcommand};
use jinglesmith::config::StudioConfig;
use jinglesmith::jingle::JingleMixer;
use jinglesmith::metadata::AudioMetadata;
use jinglesmith::mix::{MixConfig, MixOverrides, MixResult};
use jinglesmith::preview;
use jinglesmith::processor::{AudioProcessor, FfmpegProcessor};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "jinglesmith", about = "Broadcast jingle mixing engine CLI")]
#[command(version)]
struct Cli {
    /// Emit results as JSON instead of status lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mix a speech recording over a looped, ducked music bed
    Mix {
        /// Speech recording to mix
        speech: PathBuf,
        /// Music bed: library name, file name, or absolute path
        music: String,
        /// Output file (default: generated name under the audio dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Music bed volume multiplier
        #[arg(long)]
        music_volume: Option<f64>,
        /// Speech volume multiplier
        #[arg(long)]
        voice_volume: Option<f64>,
        /// Fraction the bed drops by under speech (0.0-1.0)
        #[arg(long)]
        duck_level: Option<f64>,
        /// Music-only lead-in before the speech, in seconds
        #[arg(long)]
        intro_silence: Option<f64>,
        /// Music-only tail after the speech, in seconds
        #[arg(long)]
        outro_silence: Option<f64>,
        /// Music fade-in length, in seconds
        #[arg(long)]
        fade_in: Option<f64>,
        /// Music fade-out length, in seconds
        #[arg(long)]
        fade_out: Option<f64>,
        /// Stored settings profile as a JSON object; explicit flags win
        #[arg(long)]
        overrides_json: Option<String>,
        /// Hold the bed at a constant level instead of ducking it
        #[arg(long)]
        no_ducking: bool,
        /// On mix failure, deliver the unmixed speech instead of failing
        #[arg(long)]
        fallback: bool,
    },
    /// Wrap a speech recording in intro/outro announcement chimes
    Announce {
        /// Speech recording to wrap
        speech: PathBuf,
        /// Output file (default: generated name under the audio dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Intro chime sound name (default: the standard chime)
        #[arg(long)]
        intro: Option<String>,
        /// Outro chime sound name (default: the standard chime)
        #[arg(long)]
        outro: Option<String>,
    },
    /// Re-encode a clip with a flat gain change
    #[command(allow_negative_numbers = true)]
    Gain {
        /// Input audio file
        input: PathBuf,
        /// Gain change in dB (positive = louder)
        db: f64,
        /// Output file (default: generated name under the audio dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print an audio file's duration in seconds, as the external tool sees it
    Probe {
        file: PathBuf,
    },
    /// Show an audio file's properties and tags
    Info {
        file: PathBuf,
    },
    /// Play a clip on the local audio output
    Preview {
        file: PathBuf,
    },
    /// Studio configuration
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Show current settings
    Show,
    /// Write a default config file
    Init,
    /// Set the music bed directory
    MusicDir { path: PathBuf },
    /// Set the stock sounds directory
    SoundsDir { path: PathBuf },
    /// Set the produced-clips directory
    AudioDir { path: PathBuf },
    /// Set the external tool binaries
    Tools {
        #[arg(long)]
        ffmpeg: Option<String>,
        #[arg(long)]
        ffprobe: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jinglesmith=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = StudioConfig::load();

    match cli.command {
        Commands::Mix {
            speech,
            music,
            output,
            music_volume,
            voice_volume,
            duck_level,
            intro_silence,
            outro_silence,
            fade_in,
            fade_out,
            overrides_json,
            no_ducking,
            fallback,
        } => {
            let mut overrides = match overrides_json.as_deref() {
                Some(raw) => match serde_json::from_str::<MixOverrides>(raw) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        eprintln!("Error: invalid overrides JSON: {}", e);
                        std::process::exit(1);
                    }
                },
                None => MixOverrides::default(),
            };
            // explicit flags beat the stored profile
            if music_volume.is_some() {
                overrides.music_volume = music_volume;
            }
            if voice_volume.is_some() {
                overrides.voice_volume = voice_volume;
            }
            if duck_level.is_some() {
                overrides.duck_level = duck_level;
            }
            if intro_silence.is_some() {
                overrides.intro_silence = intro_silence;
            }
            if outro_silence.is_some() {
                overrides.outro_silence = outro_silence;
            }

            let mut mix_config = match MixConfig::default().with_overrides(&overrides) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            if let Some(secs) = fade_in {
                mix_config.fade_in = secs;
            }
            if let Some(secs) = fade_out {
                mix_config.fade_out = secs;
            }
            if no_ducking {
                mix_config.ducking_enabled = false;
            }

            let output = output.unwrap_or_else(|| generated_output("jingle", &config.audio_dir));
            ensure_parent(&output)?;
            let mixer = JingleMixer::new(FfmpegProcessor::new(&config), &config);

            if fallback {
                let delivered = mixer
                    .mix_or_fallback(&speech, &music, &output, &mix_config)
                    .await
                    .context("could not deliver audio")?;
                if cli.json {
                    println!("{}", to_json(&delivered));
                } else if delivered.mixed {
                    println!("Created {} ({:.1}s)", output.display(), delivered.duration);
                } else {
                    println!(
                        "Mix failed ({}); delivered unmixed speech as {}",
                        delivered.mix_error.as_deref().unwrap_or("unknown error"),
                        output.display()
                    );
                }
            } else {
                let result = mixer.create_jingle(&speech, &music, &output, &mix_config).await;
                report(&result, &output, cli.json);
            }
        }

        Commands::Announce { speech, output, intro, outro } => {
            let output = output.unwrap_or_else(|| generated_output("announce", &config.audio_dir));
            ensure_parent(&output)?;
            let mixer = JingleMixer::new(FfmpegProcessor::new(&config), &config);
            let result = mixer
                .add_announcement_sounds(&speech, &output, intro.as_deref(), outro.as_deref())
                .await;
            report(&result, &output, cli.json);
        }

        Commands::Gain { input, db, output } => {
            let output = output.unwrap_or_else(|| generated_output("gain", &config.audio_dir));
            ensure_parent(&output)?;
            let mixer = JingleMixer::new(FfmpegProcessor::new(&config), &config);
            let result = mixer.adjust_gain(&input, &output, db).await;
            report(&result, &output, cli.json);
        }

        Commands::Probe { file } => {
            let duration = FfmpegProcessor::new(&config).probe_duration(&file).await;
            if duration <= 0.0 {
                eprintln!("Error: could not determine duration of '{}'", file.display());
                std::process::exit(1);
            }
            if cli.json {
                println!("{}", serde_json::json!({ "duration": duration }));
            } else {
                println!("{:.1}", duration);
            }
        }

        Commands::Info { file } => {
            let meta = match AudioMetadata::read(&file) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            if cli.json {
                println!("{}", to_json(&meta));
            } else {
                println!("File:     {}", meta.path.display());
                println!("Size:     {} bytes", meta.file_size_bytes);
                println!("Duration: {}", meta.duration_display());
                if let Some(rate) = meta.sample_rate {
                    println!("Rate:     {} Hz", rate);
                }
                if let Some(channels) = meta.channels {
                    println!("Channels: {}", channels);
                }
                if let Some(kbps) = meta.bitrate_kbps {
                    println!("Bitrate:  {} kbps", kbps);
                }
                if let Some(title) = &meta.title {
                    println!("Title:    {}", title);
                }
                if let Some(artist) = &meta.artist {
                    println!("Artist:   {}", artist);
                }
            }
        }

        Commands::Preview { file } => {
            println!("Previewing {}...", file.display());
            if let Err(e) = preview::play_blocking(&file) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            println!("Done.");
        }

        Commands::Config { action } => run_config(action, config, cli.json)?,
    }

    Ok(())
}

fn run_config(action: ConfigCmd, mut config: StudioConfig, json: bool) -> anyhow::Result<()> {
    match action {
        ConfigCmd::Show => {
            if json {
                println!("{}", to_json(&config));
            } else {
                println!("Config:    {}", StudioConfig::default_path().display());
                println!("Music:     {}", config.music_dir.display());
                println!("Sounds:    {}", config.sounds_dir.display());
                println!("Audio:     {}", config.audio_dir.display());
                println!("Temp:      {}", config.temp_dir.display());
                println!("Tools:     {} / {}", config.ffmpeg, config.ffprobe);
                println!(
                    "Timeouts:  mix {}s, concat {}s, probe {}s",
                    config.mix_timeout_secs, config.concat_timeout_secs, config.probe_timeout_secs
                );
                println!(
                    "Encode:    {} ch, {} Hz, {} @ {}",
                    config.encode.channels,
                    config.encode.sample_rate,
                    config.encode.codec,
                    config.encode.bitrate
                );
            }
        }
        ConfigCmd::Init => {
            let path = StudioConfig::default_path();
            StudioConfig::default()
                .save()
                .map_err(anyhow::Error::msg)
                .context("could not write config file")?;
            println!("Wrote {}", path.display());
        }
        ConfigCmd::MusicDir { path } => {
            config.music_dir = path;
            save_config(&config)?;
            println!("Music dir set to {}", config.music_dir.display());
        }
        ConfigCmd::SoundsDir { path } => {
            config.sounds_dir = path;
            save_config(&config)?;
            println!("Sounds dir set to {}", config.sounds_dir.display());
        }
        ConfigCmd::AudioDir { path } => {
            config.audio_dir = path;
            save_config(&config)?;
            println!("Audio dir set to {}", config.audio_dir.display());
        }
        ConfigCmd::Tools { ffmpeg, ffprobe } => {
            if ffmpeg.is_none() && ffprobe.is_none() {
                eprintln!("Error: nothing to set; pass --ffmpeg and/or --ffprobe");
                std::process::exit(1);
            }
            if let Some(tool) = ffmpeg {
                config.ffmpeg = tool;
            }
            if let Some(tool) = ffprobe {
                config.ffprobe = tool;
            }
            save_config(&config)?;
            println!("Tools set to {} / {}", config.ffmpeg, config.ffprobe);
        }
    }
    Ok(())
}

fn save_config(config: &StudioConfig) -> anyhow::Result<()> {
    config
        .save()
        .map_err(anyhow::Error::msg)
        .context("could not save config file")
}

/// Timestamped unique output name under the given directory.
fn generated_output(prefix: &str, dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let token = format!("{:08x}", fastrand::u32(..));
    dir.join(format!("{}_{}_{}.mp3", prefix, stamp, token))
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("could not create {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Print one mix outcome and exit non-zero on failure.
fn report(result: &MixResult, output: &Path, json: bool) {
    if json {
        println!("{}", to_json(result));
    } else if result.success {
        println!("Created {} ({:.1}s)", output.display(), result.duration.unwrap_or(0.0));
    } else {
        eprintln!("Error: {}", result.error.as_deref().unwrap_or("unknown error"));
    }
    if !result.success {
        std::process::exit(1);
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).expect("serialize to JSON")
}
