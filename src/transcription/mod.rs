//! Transcription module for Teksting.
//!
//! Wraps an external speech recognition model behind [`SpeechModel`]. The model
//! is loaded at most once per process by a [`ModelCache`] and shared by every
//! request through the [`TranscriptionAdapter`].
//!
//! # Backends
//!
//! - **whisper.cpp** (default): a local ggml model run by the whisper.cpp CLI.
//! - **OpenAI**: the hosted Whisper API.

mod cache;
mod models;
mod openai;
mod whisper_cpp;

pub use cache::ModelCache;
pub use models::{SegmentExport, TranscriptExport, TranscriptResult, TranscriptSegment};
pub use openai::{remote_model_id, OpenAiLoader, OpenAiModel};
pub use whisper_cpp::{resolve_model_path, WhisperCppLoader, WhisperCppModel};

use crate::config::{Settings, TranscriptionBackend};
use crate::error::{Result, TekstingError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Inference task requested from the model.
///
/// Only transcription in the source language is offered. Backends never
/// translate, so they do not branch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Transcribe,
}

/// Per-call decoding options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub language: String,
    pub task: Task,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            task: Task::Transcribe,
        }
    }
}

/// What to load: a size selector bound to a compute device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub size: String,
    pub device: String,
}

impl ModelSpec {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            size: settings.transcription.model_size.clone(),
            device: settings.transcription.device.clone(),
        }
    }

    /// Whether inference must stay on the CPU.
    pub fn cpu_only(&self) -> bool {
        self.device.eq_ignore_ascii_case("cpu")
    }
}

/// A loaded speech recognition model.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    /// Transcribe an audio file into timed segments.
    async fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<TranscriptResult>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Loads a [`SpeechModel`] for a [`ModelSpec`].
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn SpeechModel>>;
}

/// Build the loader for the configured backend.
pub fn build_loader(settings: &Settings) -> Arc<dyn ModelLoader> {
    match settings.transcription.backend {
        TranscriptionBackend::WhisperCpp => Arc::new(WhisperCppLoader::new(
            &settings.transcription.whisper_binary,
            settings.models_dir(),
            settings.transcription.threads,
            Duration::from_secs(settings.transcription.timeout_seconds),
        )),
        TranscriptionBackend::OpenAi => Arc::new(OpenAiLoader::new(Duration::from_secs(
            settings.transcription.timeout_seconds,
        ))),
    }
}

/// Transcribes files with the process-wide cached model.
///
/// Language is forced to the configured value and the task to transcription.
#[derive(Clone)]
pub struct TranscriptionAdapter {
    cache: Arc<ModelCache>,
    options: DecodeOptions,
}

impl TranscriptionAdapter {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self {
            cache,
            options: DecodeOptions::default(),
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.options.language = language.to_string();
        self
    }

    /// Transcribe an existing, readable audio or video file.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    pub async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptResult> {
        let model = self.cache.get_or_load().await?;

        let result = model
            .transcribe(audio_path, &self.options)
            .await
            .map_err(|e| match e {
                TekstingError::Transcription(_) | TekstingError::ModelLoad(_) => e,
                other => TekstingError::Transcription(other.to_string()),
            })?;

        info!(
            segments = result.segments.len(),
            duration = result.duration_seconds(),
            "Transcription complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingModel;

    #[async_trait]
    impl SpeechModel for FailingModel {
        async fn transcribe(&self, _: &Path, _: &DecodeOptions) -> Result<TranscriptResult> {
            Err(TekstingError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "garbled audio",
            )))
        }

        fn describe(&self) -> String {
            "failing".into()
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl ModelLoader for FailingLoader {
        async fn load(&self, _: &ModelSpec) -> Result<Arc<dyn SpeechModel>> {
            Ok(Arc::new(FailingModel))
        }
    }

    #[tokio::test]
    async fn test_decoding_errors_map_to_transcription_stage() {
        let cache = Arc::new(ModelCache::new(
            Arc::new(FailingLoader),
            ModelSpec {
                size: "base".into(),
                device: "cpu".into(),
            },
        ));
        let adapter = TranscriptionAdapter::new(cache);

        let err = adapter.transcribe(Path::new("/nope.wav")).await.unwrap_err();
        assert!(matches!(err, TekstingError::Transcription(ref m) if m.contains("garbled audio")));
        assert_eq!(err.stage(), crate::error::PipelineStage::Transcription);
    }

    #[test]
    fn test_default_decode_options() {
        let options = DecodeOptions::default();
        assert_eq!(options.language, "en");
        assert_eq!(options.task, Task::Transcribe);
    }

    #[test]
    fn test_cpu_only() {
        let spec = ModelSpec {
            size: "base".into(),
            device: "CPU".into(),
        };
        assert!(spec.cpu_only());
        assert!(!ModelSpec { device: "cuda".into(), ..spec }.cpu_only());
    }
}
