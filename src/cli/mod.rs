use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "revoice",
    about = "revoice - Download a video's audio, transcribe it with Deepgram and re-voice it with ElevenLabs",
    version,
    long_about = "A CLI tool that downloads the audio track of a video with yt-dlp, converts it to text using the Deepgram API, and synthesizes new speech from that text using the ElevenLabs API."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./revoice.yaml or the user config directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download, transcribe and re-synthesize the audio of a video
    Run {
        /// Video URL (anything yt-dlp understands)
        #[arg(value_name = "URL")]
        url: String,

        /// Deepgram API key
        #[arg(long, env = "DEEPGRAM_API_KEY", hide_env_values = true, value_name = "KEY")]
        deepgram_key: Option<String>,

        /// ElevenLabs API key
        #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true, value_name = "KEY")]
        elevenlabs_key: Option<String>,

        /// Directory for downloaded and synthesized audio
        #[arg(short = 'd', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Path of the synthesized speech file (overrides the output directory for this file)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// HTTP request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Also save the transcript to a text file
        #[arg(long, value_name = "FILE")]
        transcript_out: Option<PathBuf>,

        /// Summary format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },

    /// Check that yt-dlp and ffmpeg are installed
    Check,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Human readable summary
    Text,
    /// JSON document describing the run
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
