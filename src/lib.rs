//! revoice - re-voice online videos from the command line
//!
//! This library downloads the audio track of a video (via `yt-dlp`), transcribes it with
//! the Deepgram listen API and synthesizes new speech from the transcript with the
//! ElevenLabs text-to-speech API. The three stages are composed by [`Pipeline`].

use std::path::PathBuf;

pub mod cli;
pub mod config;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod synthesize;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::{ApiKey, Config, Credentials};
pub use fetch::{AudioArtifact, AudioFetcher, YtDlpFetcher};
pub use pipeline::{Pipeline, PipelineOutput, Stage};
pub use synthesize::{ElevenLabsSynthesizer, SpeechArtifact, Synthesizer};
pub use transcribe::{DeepgramTranscriber, Transcriber};

/// Result type used for application glue (config, CLI)
pub type Result<T> = anyhow::Result<T>;

/// Errors raised while resolving and downloading the source audio
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Source URL is empty")]
    EmptyUrl,

    #[error("{tool} could not be started: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to resolve metadata for {url}: {message}")]
    Metadata { url: String, message: String },

    #[error("Failed to download audio for {url}: {message}")]
    Download { url: String, message: String },

    #[error("Download finished but {} does not exist", .0.display())]
    MissingOutput(PathBuf),

    #[error("Cannot prepare output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the speech-to-text stage
#[derive(thiserror::Error, Debug)]
pub enum TranscriptionError {
    #[error("Transcription API key is empty")]
    MissingApiKey,

    #[error("Failed to read audio file {}: {source}", .path.display())]
    ReadAudio {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcription request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Deepgram API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Malformed transcription response ({reason}): {body}")]
    MalformedResponse { reason: String, body: String },
}

/// Errors raised by the text-to-speech stage
#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("Synthesis API key is empty")]
    MissingApiKey,

    #[error("Speech synthesis request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Eleven Labs API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Failed to write synthesized audio to {}: {source}", .path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a pipeline run, tagged with the stage that failed
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Error downloading source audio: {0}")]
    Fetch(#[from] FetchError),

    #[error("Error in audio to text conversion: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Error in text to speech conversion: {0}")]
    Synthesis(#[from] SynthesisError),
}

impl PipelineError {
    /// The stage that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Fetch(_) => Stage::Fetch,
            PipelineError::Transcription(_) => Stage::Transcribe,
            PipelineError::Synthesis(_) => Stage::Synthesize,
        }
    }
}
