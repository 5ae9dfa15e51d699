use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod ytdlp;

pub use ytdlp::YtDlpFetcher;

use crate::utils::sanitize_filename;
use crate::FetchError;

/// Extension of every fetched audio file
pub const AUDIO_EXTENSION: &str = "mp3";

/// Content type declared when uploading fetched audio
pub const AUDIO_CONTENT_TYPE: &str = "audio/mp3";

/// A local audio file produced by a fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioArtifact {
    /// Path to the transcoded audio file
    pub path: PathBuf,

    /// Title of the source media
    pub title: String,

    /// Duration of the source if known
    pub duration: Option<Duration>,

    /// URL the audio was fetched from
    pub source_url: String,
}

/// Metadata resolved for a source before downloading
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
}

impl VideoMetadata {
    /// Parse the JSON document printed by `yt-dlp --dump-json`
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// File stem derived from the title, falling back to the ID
    pub fn file_stem(&self) -> String {
        [self.title.as_str(), self.id.as_str()]
            .iter()
            .map(|candidate| sanitize_filename(candidate))
            .find(|stem| !stem.is_empty() && stem.chars().any(|c| c != '.'))
            .unwrap_or_else(|| "audio".to_string())
    }

    /// Final path of the transcoded audio inside `output_dir`
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.{}", self.file_stem(), AUDIO_EXTENSION))
    }

    /// Like [`output_path`](Self::output_path), but never returns `reserved`.
    /// A clashing stem gets the video ID (or `source`) appended.
    pub fn output_path_avoiding(&self, output_dir: &Path, reserved: Option<&Path>) -> PathBuf {
        let path = self.output_path(output_dir);
        if reserved != Some(path.as_path()) {
            return path;
        }

        let suffix = Some(sanitize_filename(&self.id))
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| "source".to_string());
        output_dir.join(format!("{}-{}.{}", self.file_stem(), suffix, AUDIO_EXTENSION))
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }
}

/// Retrieves the audio track of a remote video as a local file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Download the best available audio for `url` and transcode it to MP3
    async fn fetch(&self, url: &str) -> Result<AudioArtifact, FetchError>;
}
