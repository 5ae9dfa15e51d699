use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, Credentials};
use crate::fetch::{AudioArtifact, AudioFetcher, YtDlpFetcher};
use crate::synthesize::{ElevenLabsSynthesizer, SpeechArtifact, Synthesizer};
use crate::transcribe::{DeepgramTranscriber, Transcriber};
use crate::utils::preview;
use crate::PipelineError;

/// Characters of the transcript shown in progress output
const TRANSCRIPT_PREVIEW_CHARS: usize = 100;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Transcribe,
    Synthesize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Transcribe => write!(f, "transcribe"),
            Stage::Synthesize => write!(f, "synthesize"),
        }
    }
}

/// Everything a successful run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Audio downloaded from the source
    pub source_audio: AudioArtifact,

    /// Text recognized in the source audio
    pub transcript: String,

    /// Newly synthesized speech
    pub speech: SpeechArtifact,
}

impl PipelineOutput {
    /// Path of the final audio file
    pub fn speech_path(&self) -> &PathBuf {
        &self.speech.path
    }
}

/// Fetch, transcribe and re-synthesize a video's audio, one stage after another
pub struct Pipeline {
    fetcher: Box<dyn AudioFetcher>,
    transcriber: Box<dyn Transcriber>,
    synthesizer: Box<dyn Synthesizer>,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(
        fetcher: Box<dyn AudioFetcher>,
        transcriber: Box<dyn Transcriber>,
        synthesizer: Box<dyn Synthesizer>,
    ) -> Self {
        Self {
            fetcher,
            transcriber,
            synthesizer,
            show_progress: false,
        }
    }

    /// Build the yt-dlp / Deepgram / ElevenLabs pipeline described by `config`
    pub fn from_config(config: &Config, credentials: &Credentials) -> crate::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        let fetcher = YtDlpFetcher::from_config(config);
        let transcriber = DeepgramTranscriber::new(
            client.clone(),
            &config.transcription,
            credentials.transcription.clone(),
        )?;
        let synthesizer = ElevenLabsSynthesizer::new(
            client,
            config.synthesis.clone(),
            credentials.synthesis.clone(),
            config.speech_output_path(),
        )?;

        Ok(Self::new(
            Box::new(fetcher),
            Box::new(transcriber),
            Box::new(synthesizer),
        ))
    }

    /// Replace the fetch stage, keeping the configured services
    pub fn with_fetcher(mut self, fetcher: Box<dyn AudioFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Show spinners on the terminal while stages run
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run all stages for `url`. A failed stage stops the run; files already written stay in place.
    pub async fn run(&self, url: &str) -> Result<PipelineOutput, PipelineError> {
        let progress = self.spinner();

        tracing::info!(stage = %Stage::Fetch, "Downloading source audio");
        progress.set_message("Downloading source audio...");
        let source_audio = self
            .fetcher
            .fetch(url)
            .await
            .inspect_err(|e| fail(&progress, Stage::Fetch, e))?;
        tracing::info!(stage = %Stage::Fetch, "Audio downloaded: {}", source_audio.path.display());

        tracing::info!(stage = %Stage::Transcribe, "Converting audio to text");
        progress.set_message("Transcribing audio...");
        let transcript = self
            .transcriber
            .transcribe(&source_audio.path)
            .await
            .inspect_err(|e| fail(&progress, Stage::Transcribe, e))?;
        tracing::info!(
            stage = %Stage::Transcribe,
            "Transcribed text: {}",
            preview(&transcript, TRANSCRIPT_PREVIEW_CHARS)
        );

        tracing::info!(stage = %Stage::Synthesize, "Converting text back to speech");
        progress.set_message("Synthesizing speech...");
        let speech = self
            .synthesizer
            .synthesize(&transcript)
            .await
            .inspect_err(|e| fail(&progress, Stage::Synthesize, e))?;
        tracing::info!(stage = %Stage::Synthesize, "Speech written to {}", speech.path.display());

        progress.finish_with_message("Done");

        Ok(PipelineOutput {
            source_audio,
            transcript,
            speech,
        })
    }

    fn spinner(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress.enable_steady_tick(Duration::from_millis(120));
        progress
    }
}

fn fail(progress: &ProgressBar, stage: Stage, error: &dyn std::error::Error) {
    tracing::error!(stage = %stage, "Stage failed: {}", error);
    progress.abandon_with_message(format!("{} stage failed", stage));
}
