//! OpenAI Whisper API transcription.

use super::{DecodeOptions, ModelLoader, ModelSpec, SpeechModel, TranscriptResult, TranscriptSegment};
use crate::error::{Result, TekstingError};
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Local Whisper sizes that the hosted API serves as `whisper-1`.
const LOCAL_SIZES: &[&str] = &[
    "tiny", "tiny.en", "base", "base.en", "small", "small.en", "medium", "medium.en", "large",
    "large-v1", "large-v2", "large-v3", "large-v3-turbo", "turbo",
];

/// Map a size selector to a hosted model id.
pub fn remote_model_id(size: &str) -> String {
    if LOCAL_SIZES.contains(&size) {
        "whisper-1".to_string()
    } else {
        size.to_string()
    }
}

/// Builds an API client; the device selector has no meaning for a hosted model.
pub struct OpenAiLoader {
    timeout: Duration,
}

impl OpenAiLoader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ModelLoader for OpenAiLoader {
    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn SpeechModel>> {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.is_empty() => {}
            _ => return Err(TekstingError::ModelLoad("OPENAI_API_KEY not set".to_string())),
        }

        if !spec.cpu_only() {
            warn!(device = %spec.device, "Device selector ignored by the hosted backend");
        }

        let http_client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| TekstingError::ModelLoad(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Arc::new(OpenAiModel {
            client: Client::with_config(OpenAIConfig::default()).with_http_client(http_client),
            model: remote_model_id(&spec.size),
        }))
    }
}

/// Hosted Whisper model.
pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    model: String,
}

#[async_trait]
impl SpeechModel for OpenAiModel {
    #[instrument(skip(self, options), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<TranscriptResult> {
        let file_bytes = tokio::fs::read(audio_path).await?;

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.wav")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .language(&options.language)
            .response_format(AudioResponseFormat::VerboseJson)
            .build()
            .map_err(|e| TekstingError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| TekstingError::Transcription(format!("Whisper API error: {}", e)))?;

        let segments: Vec<TranscriptSegment> = response
            .segments
            .map(|segs| {
                segs.iter()
                    .map(|s| TranscriptSegment::new(s.start as f64, s.end as f64, s.text.clone()))
                    .collect()
            })
            .unwrap_or_else(|| {
                // No segment list: one segment spanning the whole text
                vec![TranscriptSegment::new(0.0, response.duration as f64, response.text.clone())]
            });

        debug!("Transcribed {} segments", segments.len());

        let language = if response.language.is_empty() {
            options.language.clone()
        } else {
            response.language
        };
        Ok(TranscriptResult::from_raw_segments(language, segments))
    }

    fn describe(&self) -> String {
        format!("openai {}", self.model)
    }
}
