use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TRANSCRIPTION_ENDPOINT: &str = "https://api.deepgram.com/v1/listen";
pub const DEFAULT_SYNTHESIS_ENDPOINT: &str = "https://api.elevenlabs.io/v1/text-to-speech";

/// Voice ID for "Rachel"
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
pub const DEFAULT_MODEL_ID: &str = "eleven_monolingual_v1";
pub const DEFAULT_OUTPUT_FILE: &str = "output_speech.mp3";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source download settings
    pub fetch: FetchConfig,

    /// Speech-to-text service settings
    pub transcription: TranscriptionConfig,

    /// Text-to-speech service settings
    pub synthesis: SynthesisConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// yt-dlp format selector
    pub format: String,

    /// Target bitrate passed to the audio extractor
    pub audio_quality: String,

    /// Directory or binary path for ffmpeg if it is not on PATH
    pub ffmpeg_location: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub endpoint: String,

    /// Content type declared for the uploaded audio
    pub content_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Base endpoint, the voice ID is appended as a path segment
    pub endpoint: String,

    pub voice_id: String,

    pub model_id: String,

    /// Voice stability (0.0 to 1.0)
    pub stability: f32,

    /// Similarity boost (0.0 to 1.0)
    pub similarity_boost: f32,

    /// Accept header sent with the request
    pub accept: String,

    /// File name of the synthesized audio inside the output directory
    pub output_file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory receiving downloaded and synthesized audio (current directory if unset)
    pub output_dir: Option<PathBuf>,

    /// Explicit path for the synthesized speech, replacing `output_dir/synthesis.output_file`
    pub speech_output: Option<PathBuf>,

    /// Per-request timeout for HTTP calls; transport default when unset
    pub request_timeout_secs: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            format: "bestaudio/best".to_string(),
            audio_quality: "192K".to_string(),
            ffmpeg_location: None,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_TRANSCRIPTION_ENDPOINT.to_string(),
            content_type: crate::fetch::AUDIO_CONTENT_TYPE.to_string(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SYNTHESIS_ENDPOINT.to_string(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            stability: 0.5,
            similarity_boost: 0.5,
            accept: "audio/mpeg".to_string(),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, the local file or the user config directory.
    /// Falls back to defaults when no file exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        Self::load_or_default(Self::lookup_path())
    }

    fn load_or_default(candidate: Option<PathBuf>) -> Result<Self> {
        match candidate {
            Some(path) if path.exists() => Self::load_from(&path),
            Some(path) => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                tracing::debug!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate a configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate YAML configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Self::lookup_path().context("Could not determine config directory")
    }

    /// Local `revoice.yaml` if present, else the file in the user config directory.
    /// `None` when the platform has no config directory.
    fn lookup_path() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("revoice.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir().map(|dir| dir.join("revoice").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.fetch.yt_dlp_path.trim().is_empty() {
            anyhow::bail!("fetch.yt_dlp_path must not be empty");
        }
        if self.transcription.endpoint.trim().is_empty() {
            anyhow::bail!("transcription.endpoint must not be empty");
        }
        if self.synthesis.endpoint.trim().is_empty() {
            anyhow::bail!("synthesis.endpoint must not be empty");
        }
        if self.synthesis.voice_id.trim().is_empty() {
            anyhow::bail!("synthesis.voice_id must not be empty");
        }
        if self.synthesis.model_id.trim().is_empty() {
            anyhow::bail!("synthesis.model_id must not be empty");
        }
        if self.synthesis.output_file.trim().is_empty() {
            anyhow::bail!("synthesis.output_file must not be empty");
        }
        if !(0.0..=1.0).contains(&self.synthesis.stability) {
            anyhow::bail!("synthesis.stability must be between 0.0 and 1.0, got {}", self.synthesis.stability);
        }
        if !(0.0..=1.0).contains(&self.synthesis.similarity_boost) {
            anyhow::bail!(
                "synthesis.similarity_boost must be between 0.0 and 1.0, got {}",
                self.synthesis.similarity_boost
            );
        }
        if self.app.request_timeout_secs == Some(0) {
            anyhow::bail!("app.request_timeout_secs must be greater than zero");
        }

        Ok(())
    }

    /// Directory that receives all audio files
    pub fn output_dir(&self) -> PathBuf {
        self.app
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Where the synthesized speech is written
    pub fn speech_output_path(&self) -> PathBuf {
        match &self.app.speech_output {
            Some(path) => path.clone(),
            None => self.output_dir().join(&self.synthesis.output_file),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.app.request_timeout_secs.map(Duration::from_secs)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  yt-dlp: {}", self.fetch.yt_dlp_path);
        println!("  Format: {} ({})", self.fetch.format, self.fetch.audio_quality);
        if let Some(ffmpeg) = &self.fetch.ffmpeg_location {
            println!("  ffmpeg: {}", ffmpeg.display());
        }
        println!("  Transcription endpoint: {}", self.transcription.endpoint);
        println!("  Synthesis endpoint: {}", self.synthesis.endpoint);
        println!("  Voice: {} (model {})", self.synthesis.voice_id, self.synthesis.model_id);
        println!(
            "  Voice settings: stability {}, similarity boost {}",
            self.synthesis.stability, self.synthesis.similarity_boost
        );
        println!("  Output: {}", self.speech_output_path().display());
        match self.app.request_timeout_secs {
            Some(secs) => println!("  Request timeout: {}s", secs),
            None => println!("  Request timeout: transport default"),
        }
    }
}

/// An API key. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw key for request headers
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(<empty>)")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

/// Keys for the two remote services
#[derive(Debug, Clone)]
pub struct Credentials {
    pub transcription: ApiKey,
    pub synthesis: ApiKey,
}

impl Credentials {
    pub fn new(transcription: ApiKey, synthesis: ApiKey) -> Self {
        Self { transcription, synthesis }
    }
}
