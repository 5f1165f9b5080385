//! Configuration settings for Teksting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub transcription: TranscriptionSettings,
    pub transcode: TranscodeSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Working directory for request-scoped staged files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/data/temp".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Name reported by the health endpoint.
    pub service_name: String,
    /// Maximum accepted request body in megabytes.
    pub max_upload_mb: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            service_name: "teksting".to_string(),
            max_upload_mb: 2048,
        }
    }
}

impl ServerSettings {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Speech model backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionBackend {
    /// Local whisper.cpp command-line binary with a ggml model file.
    #[default]
    WhisperCpp,
    /// Hosted OpenAI Whisper API.
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
}

impl std::str::FromStr for TranscriptionBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "whisper_cpp" | "whisper-cpp" | "whispercpp" | "local" => {
                Ok(TranscriptionBackend::WhisperCpp)
            }
            "openai" | "open_ai" => Ok(TranscriptionBackend::OpenAi),
            _ => Err(format!("Unknown transcription backend: {}", s)),
        }
    }
}

impl std::fmt::Display for TranscriptionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionBackend::WhisperCpp => write!(f, "whisper_cpp"),
            TranscriptionBackend::OpenAi => write!(f, "openai"),
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Which speech model backend to load.
    pub backend: TranscriptionBackend,
    /// Model size selector (tiny, base, small, medium, large-v3, ...).
    pub model_size: String,
    /// Compute device selector (cpu, cuda, auto).
    pub device: String,
    /// Language passed to the model.
    pub language: String,
    /// Directory holding ggml model files for whisper.cpp.
    pub models_dir: String,
    /// whisper.cpp command-line binary.
    pub whisper_binary: String,
    /// Worker threads for whisper.cpp (None = binary default).
    pub threads: Option<u32>,
    /// Upper bound for a single transcription run.
    pub timeout_seconds: u64,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            backend: TranscriptionBackend::WhisperCpp,
            model_size: "base".to_string(),
            device: "cpu".to_string(),
            language: "en".to_string(),
            models_dir: "~/.cache/whisper".to_string(),
            whisper_binary: "whisper-cli".to_string(),
            threads: None,
            timeout_seconds: 1800,
        }
    }
}

/// External transcoding tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeSettings {
    /// ffmpeg binary.
    pub ffmpeg_binary: String,
    /// Timeout for audio extraction.
    pub audio_timeout_seconds: u64,
    /// Timeout for subtitle burning.
    pub burn_timeout_seconds: u64,
    /// x264 preset used when re-encoding video.
    pub preset: String,
    /// x264 constant rate factor.
    pub crf: u8,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            audio_timeout_seconds: 300,
            burn_timeout_seconds: 600,
            preset: "medium".to_string(),
            crf: 23,
        }
    }
}

impl TranscodeSettings {
    pub fn audio_timeout(&self) -> Duration {
        Duration::from_secs(self.audio_timeout_seconds)
    }

    pub fn burn_timeout(&self) -> Duration {
        Duration::from_secs(self.burn_timeout_seconds)
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment overrides are applied on top of the file contents.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Apply overrides from environment-style lookups.
    ///
    /// The lookup is injected so tests never have to mutate process env.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> crate::error::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MODEL_SIZE") {
            self.transcription.model_size = v;
        }
        if let Some(v) = get("DEVICE") {
            self.transcription.device = v;
        }
        if let Some(v) = get("TEMP_DIR") {
            self.general.temp_dir = v;
        }
        if let Some(v) = get("FFMPEG_PATH") {
            self.transcode.ffmpeg_binary = v;
        }
        if let Some(v) = get("WHISPER_BIN") {
            self.transcription.whisper_binary = v;
        }
        if let Some(v) = get("WHISPER_MODELS_DIR") {
            self.transcription.models_dir = v;
        }
        if let Some(v) = get("TRANSCRIPTION_BACKEND") {
            self.transcription.backend = v
                .parse()
                .map_err(crate::error::TekstingError::Config)?;
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TekstingError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("teksting")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded whisper.cpp models directory.
    pub fn models_dir(&self) -> PathBuf {
        Self::expand_path(&self.transcription.models_dir)
    }
}
