// mediaforge-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "MediaForge: media transcoding and inspection tool",
    long_about = "Drives ffmpeg and ffprobe through the mediaforge-core library."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) log output.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcodes one media file to a destination with typed output settings
    Transcode(TranscodeArgs),
    /// Prints structured information about a media file
    Probe(ProbeArgs),
}

/// How to treat an already existing destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverwritePolicy {
    /// Abort if the destination exists
    Fail,
    /// Leave the decision to the engine
    Preserve,
    /// Overwrite an existing destination
    Force,
    /// Generate a unique destination name
    Unique,
}

#[derive(Parser, Debug)]
pub struct TranscodeArgs {
    /// Source media file
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_FILE")]
    pub input: PathBuf,

    /// Destination path; may contain %index or %timecode when splitting
    #[arg(short = 'o', long = "output", required = true, value_name = "OUTPUT_FILE")]
    pub output: PathBuf,

    // --- Output Settings ---
    /// Container format (e.g. mp4, matroska)
    #[arg(long, value_name = "FORMAT")]
    pub container: Option<String>,

    /// Video codec name or alias (e.g. h264, libx264, copy)
    #[arg(long, value_name = "CODEC")]
    pub vcodec: Option<String>,

    /// Audio codec name or alias (e.g. aac, copy)
    #[arg(long, value_name = "CODEC")]
    pub acodec: Option<String>,

    /// Video bitrate in kilobits per second
    #[arg(long, value_name = "KBPS")]
    pub video_bitrate: Option<u32>,

    /// Audio bitrate in kilobits per second
    #[arg(long, value_name = "KBPS")]
    pub audio_bitrate: Option<u32>,

    /// Output frame rate
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f64>,

    /// Constant-quality scale, 1 (best) to 31 (worst)
    #[arg(long, value_name = "Q", value_parser = clap::value_parser!(u8).range(1..=31))]
    pub quality: Option<u8>,

    /// Output dimensions as WIDTHxHEIGHT
    #[arg(long, value_name = "WxH")]
    pub size: Option<String>,

    /// Drop the video streams entirely
    #[arg(long, default_value_t = false)]
    pub no_video: bool,

    /// Drop the audio streams entirely
    #[arg(long, default_value_t = false)]
    pub no_audio: bool,

    // --- Segment Extraction ---
    /// Start position in seconds for segment extraction
    #[arg(long, value_name = "SECONDS")]
    pub start: Option<f64>,

    /// Length in seconds of the extracted segment
    #[arg(long, value_name = "SECONDS", requires = "start")]
    pub duration: Option<f64>,

    // --- Splitting ---
    /// Split into segments of this many seconds each
    #[arg(long, value_name = "SECONDS", conflicts_with = "split_times")]
    pub split_interval: Option<f64>,

    /// Split at these comma-separated times in seconds
    #[arg(long, value_delimiter = ',', value_name = "SECONDS,...")]
    pub split_times: Option<Vec<f64>>,

    // --- Metadata ---
    /// Global metadata as KEY=VALUE; repeatable
    #[arg(long, value_name = "KEY=VALUE")]
    pub metadata: Vec<String>,

    // --- Behavior ---
    /// Overwrite policy for the destination
    #[arg(long, value_enum, default_value_t = OverwritePolicy::Fail)]
    pub overwrite: OverwritePolicy,

    /// Path to the ffmpeg binary
    /// Can also be set via the MEDIAFORGE_FFMPEG environment variable.
    #[arg(long, value_name = "PATH", env = "MEDIAFORGE_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe binary
    /// Can also be set via the MEDIAFORGE_FFPROBE environment variable.
    #[arg(long, value_name = "PATH", env = "MEDIAFORGE_FFPROBE")]
    pub ffprobe: Option<PathBuf>,

    /// Directory for temporary supervisor buffers (defaults to the system temp dir)
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Media file to inspect
    #[arg(required = true, value_name = "INPUT_FILE")]
    pub input: PathBuf,

    /// Print the prober's raw JSON instead of the summary
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Path to the ffprobe binary
    /// Can also be set via the MEDIAFORGE_FFPROBE environment variable.
    #[arg(long, value_name = "PATH", env = "MEDIAFORGE_FFPROBE")]
    pub ffprobe: Option<PathBuf>,

    /// Directory for temporary supervisor buffers (defaults to the system temp dir)
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,
}
