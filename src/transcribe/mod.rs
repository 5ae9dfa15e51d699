use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::Path;

use crate::config::{ApiKey, TranscriptionConfig};
use crate::utils::format_file_size;
use crate::TranscriptionError;

/// Converts an audio file into text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `audio_path`. An empty string means no speech was detected.
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError>;
}

/// Deepgram pre-recorded audio transcriber
pub struct DeepgramTranscriber {
    client: Client,
    endpoint: String,
    content_type: String,
    api_key: ApiKey,
}

impl DeepgramTranscriber {
    pub fn new(client: Client, config: &TranscriptionConfig, api_key: ApiKey) -> Result<Self, TranscriptionError> {
        if api_key.is_empty() {
            return Err(TranscriptionError::MissingApiKey);
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            content_type: config.content_type.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Transcriber for DeepgramTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        let audio = fs_err::tokio::read(audio_path)
            .await
            .map_err(|source| TranscriptionError::ReadAudio {
                path: audio_path.to_path_buf(),
                source,
            })?;

        tracing::info!(
            "Uploading {} of audio to {}",
            format_file_size(audio.len() as u64),
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Token {}", self.api_key.expose()))
            .header(CONTENT_TYPE, &self.content_type)
            .body(audio)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_transcript(&body)
    }
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    transcript: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Extract the best transcript (first channel, first alternative) from a listen response body
pub fn parse_transcript(body: &str) -> Result<String, TranscriptionError> {
    let malformed = |reason: String| TranscriptionError::MalformedResponse {
        reason,
        body: body.to_string(),
    };

    let response: ListenResponse =
        serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;

    let channel = response
        .results
        .channels
        .into_iter()
        .next()
        .ok_or_else(|| malformed("no channels in results".to_string()))?;

    let best = channel
        .alternatives
        .into_iter()
        .next()
        .ok_or_else(|| malformed("no alternatives in first channel".to_string()))?;

    if let Some(confidence) = best.confidence {
        tracing::debug!("Transcript confidence: {:.2}", confidence);
    }
    if best.transcript.is_empty() {
        tracing::warn!("Transcription service detected no speech");
    }

    Ok(best.transcript)
}
