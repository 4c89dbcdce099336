use crate::error::PipelineError;
use crate::logi;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub const OPENAI_KEY_VAR: &str = "OPENAI_KEY";
pub const RUNWAY_KEY_VAR: &str = "RUNWAY_KEY";
pub const ELEVEN_KEY_VAR: &str = "ELEVEN_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_model: String,
    pub openai_temperature: f32,
    pub openai_base_url: String,

    pub runway_base_url: String,
    /// Target clip length in seconds.
    pub video_duration_secs: u32,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,

    pub eleven_voice_id: String,
    pub eleven_model_id: String,
    pub elevenlabs_base_url: String,

    pub request_timeout_secs: u64,
    pub download_timeout_secs: u64,

    pub ffmpeg_bin: String,
    pub work_dir: PathBuf,
    pub idea_file: PathBuf,
    pub clip_file: PathBuf,
    pub voice_file: PathBuf,
    pub output_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_model: "gpt-4o-mini".to_string(),
            openai_temperature: 1.1,
            openai_base_url: "https://api.openai.com".to_string(),
            runway_base_url: "https://api.runwayml.com".to_string(),
            video_duration_secs: 15,
            poll_interval_secs: 8,
            max_poll_attempts: 150,
            eleven_voice_id: "TxGEqnHWrfWFTfGW9XjX".to_string(),
            eleven_model_id: "eleven_multilingual_v2".to_string(),
            elevenlabs_base_url: "https://api.elevenlabs.io".to_string(),
            request_timeout_secs: 120,
            download_timeout_secs: 300,
            ffmpeg_bin: "ffmpeg".to_string(),
            work_dir: PathBuf::from("."),
            idea_file: PathBuf::from("idea.json"),
            clip_file: PathBuf::from("clip.mp4"),
            voice_file: PathBuf::from("voice.mp3"),
            output_file: PathBuf::from("output.mp4"),
        }
    }
}

impl Config {
    /// Reads the config file if it exists, otherwise falls back to defaults.
    /// Keys absent from the file keep their default value.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if fs::metadata(path).await.is_err() {
            logi(format!("No config at {}; using defaults", path.display()));
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.openai_model.is_empty() {
            anyhow::bail!("config: openai_model missing");
        }
        if self.eleven_voice_id.is_empty() {
            anyhow::bail!("config: eleven_voice_id missing");
        }
        if self.video_duration_secs == 0 {
            anyhow::bail!("config: video_duration_secs must be positive");
        }
        if self.max_poll_attempts == 0 {
            anyhow::bail!("config: max_poll_attempts must be positive");
        }
        Ok(())
    }

    pub fn idea_path(&self) -> PathBuf {
        self.work_dir.join(&self.idea_file)
    }

    pub fn clip_path(&self) -> PathBuf {
        self.work_dir.join(&self.clip_file)
    }

    pub fn voice_path(&self) -> PathBuf {
        self.work_dir.join(&self.voice_file)
    }

    /// The merged video is a deliverable, so it is not placed under `work_dir`.
    pub fn output_path(&self) -> PathBuf {
        self.output_file.clone()
    }

    pub fn intermediate_paths(&self) -> [PathBuf; 3] {
        [self.idea_path(), self.clip_path(), self.voice_path()]
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// API keys for the three hosted services. Each stage asks for its own key
/// when it starts, so a missing key only fails the stage that needs it.
#[derive(Clone, Default)]
pub struct Credentials {
    openai: Option<String>,
    runway: Option<String>,
    eleven: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai", &self.openai.is_some())
            .field("runway", &self.runway.is_some())
            .field("eleven", &self.eleven.is_some())
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            openai: get(OPENAI_KEY_VAR),
            runway: get(RUNWAY_KEY_VAR),
            eleven: get(ELEVEN_KEY_VAR),
        }
    }

    pub fn openai(&self) -> Option<String> {
        self.openai.clone()
    }

    pub fn runway(&self) -> Option<String> {
        self.runway.clone()
    }

    pub fn eleven(&self) -> Option<String> {
        self.eleven.clone()
    }
}

pub(crate) fn require_key<'a>(
    key: &'a Option<String>,
    var: &'static str,
) -> Result<&'a str, PipelineError> {
    key.as_deref().ok_or(PipelineError::MissingCredential(var))
}
