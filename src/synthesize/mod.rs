use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{ApiKey, SynthesisConfig};
use crate::utils::format_file_size;
use crate::SynthesisError;

/// Synthesized speech written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechArtifact {
    pub path: PathBuf,

    /// Number of audio bytes written
    pub bytes: u64,
}

/// Converts text into a speech audio file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` and write the audio to this synthesizer's output path
    async fn synthesize(&self, text: &str) -> Result<SpeechArtifact, SynthesisError>;
}

#[derive(Debug, Serialize)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub model_id: &'a str,
    pub voice_settings: VoiceSettings,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

/// ElevenLabs text-to-speech client
pub struct ElevenLabsSynthesizer {
    client: Client,
    config: SynthesisConfig,
    api_key: ApiKey,
    output_path: PathBuf,
}

impl ElevenLabsSynthesizer {
    pub fn new(
        client: Client,
        config: SynthesisConfig,
        api_key: ApiKey,
        output_path: impl Into<PathBuf>,
    ) -> Result<Self, SynthesisError> {
        if api_key.is_empty() {
            return Err(SynthesisError::MissingApiKey);
        }

        Ok(Self {
            client,
            config,
            api_key,
            output_path: output_path.into(),
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Endpoint for the configured voice
    pub fn voice_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            urlencoding::encode(&self.config.voice_id)
        )
    }

    pub fn request_body<'a>(&'a self, text: &'a str) -> SynthesisRequest<'a> {
        SynthesisRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
            },
        }
    }

    /// Stream the response body into the output file, returning the byte count
    async fn write_body(&self, response: reqwest::Response) -> Result<u64, SynthesisError> {
        let write_error = |source: std::io::Error| SynthesisError::WriteOutput {
            path: self.output_path.clone(),
            source,
        };

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent).map_err(write_error)?;
            }
        }

        let mut file = fs_err::File::create(&self.output_path).map_err(write_error)?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).map_err(write_error)?;
            written += chunk.len() as u64;
        }

        file.flush().map_err(write_error)?;
        Ok(written)
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SpeechArtifact, SynthesisError> {
        if text.trim().is_empty() {
            tracing::warn!("Synthesizing empty text, the service may reject the request");
        }

        let url = self.voice_url();
        tracing::info!("Requesting speech for {} characters from {}", text.chars().count(), url);

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, &self.config.accept)
            .header(CONTENT_TYPE, "application/json")
            .header("xi-api-key", self.api_key.expose())
            .json(&self.request_body(text))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = self.write_body(response).await?;
        tracing::info!(
            "Wrote {} of speech to {}",
            format_file_size(bytes),
            self.output_path.display()
        );

        Ok(SpeechArtifact {
            path: self.output_path.clone(),
            bytes,
        })
    }
}
