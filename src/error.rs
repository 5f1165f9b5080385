//! Error types for Teksting.

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Upload,
    Validation,
    Staging,
    Transcription,
    AudioExtraction,
    SubtitleBurn,
    Startup,
}

impl PipelineStage {
    /// Wire name used in error bodies and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Upload => "upload",
            PipelineStage::Validation => "validation",
            PipelineStage::Staging => "staging",
            PipelineStage::Transcription => "transcription",
            PipelineStage::AudioExtraction => "audio_extraction",
            PipelineStage::SubtitleBurn => "subtitle_burn",
            PipelineStage::Startup => "startup",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Library-level error type for Teksting operations.
#[derive(Error, Debug)]
pub enum TekstingError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Invalid upload: {0}")]
    Validation(String),

    #[error("Staged file is not readable: {0}")]
    StagingUnreadable(String),

    #[error("Failed to read upload: {0}")]
    Upload(String),

    #[error("Upload too large: {0}")]
    UploadTooLarge(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("{tool} failed: {diagnostics}")]
    ToolFailed {
        tool: String,
        stage: PipelineStage,
        diagnostics: String,
    },

    #[error("{tool} timed out after {seconds}s")]
    ToolTimeout {
        tool: String,
        stage: PipelineStage,
        seconds: u64,
    },

    #[error("Output file was not created: {}", path.display())]
    MissingOutput { stage: PipelineStage, path: PathBuf },

    #[error("Failed to load speech model: {0}")]
    ModelLoad(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl TekstingError {
    /// The pipeline stage this error is attributed to.
    pub fn stage(&self) -> PipelineStage {
        match self {
            TekstingError::MissingInput(_) | TekstingError::Validation(_) => {
                PipelineStage::Validation
            }
            TekstingError::StagingUnreadable(_) | TekstingError::Io(_) => PipelineStage::Staging,
            TekstingError::Upload(_) | TekstingError::UploadTooLarge(_) => PipelineStage::Upload,
            TekstingError::ToolFailed { stage, .. }
            | TekstingError::ToolTimeout { stage, .. }
            | TekstingError::MissingOutput { stage, .. } => *stage,
            TekstingError::ModelLoad(_)
            | TekstingError::Transcription(_)
            | TekstingError::Json(_) => PipelineStage::Transcription,
            TekstingError::ToolNotFound(_)
            | TekstingError::Config(_)
            | TekstingError::TomlParse(_) => PipelineStage::Startup,
        }
    }

    /// Whether the failure is attributable to the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TekstingError::MissingInput(_)
                | TekstingError::Validation(_)
                | TekstingError::Upload(_)
                | TekstingError::UploadTooLarge(_)
        )
    }
}

/// Result type alias for Teksting operations.
pub type Result<T> = std::result::Result<T, TekstingError>;
