use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;

use super::{AudioArtifact, AudioFetcher, VideoMetadata, AUDIO_EXTENSION};
use crate::config::{Config, FetchConfig};
use crate::utils::{extract_domain, format_duration};
use crate::FetchError;

/// Audio fetcher backed by the yt-dlp command line tool (ffmpeg does the transcode)
pub struct YtDlpFetcher {
    config: FetchConfig,
    output_dir: PathBuf,
    /// Path the downloaded audio must never take (the synthesized speech lives there)
    reserved: Option<PathBuf>,
}

impl YtDlpFetcher {
    pub fn new(config: FetchConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
            reserved: None,
        }
    }

    /// Fetcher writing into the configured output directory, kept clear of the speech output
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.fetch.clone(), config.output_dir()).reserving(config.speech_output_path())
    }

    /// Never download to `path`
    pub fn reserving(mut self, path: impl Into<PathBuf>) -> Self {
        self.reserved = Some(path.into());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where the audio for `metadata` will be written
    pub fn target_path(&self, metadata: &VideoMetadata) -> PathBuf {
        metadata.output_path_avoiding(&self.output_dir, self.reserved.as_deref())
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.config.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Get video information using yt-dlp
    pub async fn resolve_metadata(&self, url: &str) -> Result<VideoMetadata, FetchError> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = self.invoke(&["--dump-json".into(), "--no-playlist".into(), url.into()]).await?;

        if !output.status.success() {
            return Err(FetchError::Metadata {
                url: url.to_string(),
                message: stderr_message(&output),
            });
        }

        let json = String::from_utf8_lossy(&output.stdout);
        VideoMetadata::from_json(json.trim()).map_err(|e| FetchError::Metadata {
            url: url.to_string(),
            message: format!("unreadable metadata: {}", e),
        })
    }

    /// Arguments for downloading the best audio stream to `target`
    pub fn download_args(&self, url: &str, target: &Path) -> Vec<OsString> {
        let template = output_template(target);

        let mut args: Vec<OsString> = vec![
            "--no-playlist".into(),
            "--format".into(),
            self.config.format.clone().into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            AUDIO_EXTENSION.into(),
            "--audio-quality".into(),
            self.config.audio_quality.clone().into(),
            "--output".into(),
            template.into_os_string(),
        ];

        if let Some(ffmpeg) = &self.config.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.clone().into_os_string());
        }

        args.push(url.into());
        args
    }

    /// Download and transcode the audio track to `target`
    pub async fn download(&self, url: &str, target: &Path) -> Result<(), FetchError> {
        tracing::debug!("Downloading audio for {} to {}", url, target.display());

        let output = self.invoke(&self.download_args(url, target)).await?;

        if !output.status.success() {
            return Err(FetchError::Download {
                url: url.to_string(),
                message: stderr_message(&output),
            });
        }

        Ok(())
    }

    async fn invoke(&self, args: &[OsString]) -> Result<Output, FetchError> {
        Command::new(&self.config.yt_dlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| FetchError::ToolUnavailable {
                tool: self.config.yt_dlp_path.clone(),
                source,
            })
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str) -> Result<AudioArtifact, FetchError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FetchError::EmptyUrl);
        }

        if let Some(domain) = extract_domain(url) {
            tracing::info!("Resolving media from {}", domain);
        }

        let metadata = self.resolve_metadata(url).await?;
        let duration = metadata.duration();
        match duration {
            Some(d) => tracing::info!("Title: {} ({})", metadata.title, format_duration(d.as_secs_f64())),
            None => tracing::info!("Title: {}", metadata.title),
        }

        fs_err::tokio::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| FetchError::OutputDir {
                path: self.output_dir.clone(),
                source,
            })?;

        let target = self.target_path(&metadata);
        self.download(url, &target).await?;

        if !target.is_file() {
            return Err(FetchError::MissingOutput(target));
        }

        tracing::info!("Download complete: {}", target.display());

        Ok(AudioArtifact {
            path: target,
            title: metadata.title,
            duration,
            source_url: url.to_string(),
        })
    }
}

/// yt-dlp output template for `target`. yt-dlp fills in `%(ext)s` after the
/// audio extraction step; a literal `%` elsewhere has to be written as `%%`.
fn output_template(target: &Path) -> PathBuf {
    let escape = |part: &OsStr| part.to_string_lossy().replace('%', "%%");
    let file_name = format!("{}.%(ext)s", target.file_stem().map(escape).unwrap_or_default());

    match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => PathBuf::from(escape(dir.as_os_str())).join(file_name),
        _ => PathBuf::from(file_name),
    }
}

fn stderr_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("yt-dlp exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}
