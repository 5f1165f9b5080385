//! ffmpeg invocation for audio extraction and subtitle burning.
//!
//! Every command is built as a discrete argument list and run through
//! [`run_tool`], which enforces a wall-clock timeout and kills the process
//! when it expires.

mod filter;
mod process;

pub use filter::{escape_filter_path, subtitles_filter};
pub use process::{run_tool, ToolCommand, ToolOutput};

use crate::config::TranscodeSettings;
use crate::error::{PipelineStage, Result, TekstingError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

/// Sample rate expected by speech models.
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;

/// Runs the external transcoding tool.
#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg: String,
    audio_timeout: Duration,
    burn_timeout: Duration,
    preset: String,
    crf: u8,
}

impl Transcoder {
    pub fn new(ffmpeg: impl Into<String>, audio_timeout: Duration, burn_timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            audio_timeout,
            burn_timeout,
            preset: "medium".to_string(),
            crf: 23,
        }
    }

    pub fn from_settings(settings: &TranscodeSettings) -> Self {
        Self {
            ffmpeg: settings.ffmpeg_binary.clone(),
            audio_timeout: settings.audio_timeout(),
            burn_timeout: settings.burn_timeout(),
            preset: settings.preset.clone(),
            crf: settings.crf,
        }
    }

    pub fn ffmpeg(&self) -> &str {
        &self.ffmpeg
    }

    /// Command that downmixes to mono 16 kHz signed 16-bit PCM WAV.
    pub fn extract_audio_command(&self, input: &Path, output: &Path) -> ToolCommand {
        ToolCommand::new(&self.ffmpeg)
            .arg("-hide_banner")
            .arg("-nostdin")
            .arg("-loglevel").arg("error")
            .arg("-i").arg(input)
            .arg("-vn")
            .arg("-ac").arg("1")
            .arg("-ar").arg(SPEECH_SAMPLE_RATE.to_string())
            .arg("-acodec").arg("pcm_s16le")
            .arg("-f").arg("wav")
            .arg("-y")
            .arg(output)
    }

    /// Command that overlays subtitles, re-encodes video and copies audio.
    pub fn burn_subtitles_command(&self, video: &Path, subtitles: &Path, output: &Path) -> ToolCommand {
        ToolCommand::new(&self.ffmpeg)
            .arg("-hide_banner")
            .arg("-nostdin")
            .arg("-loglevel").arg("error")
            .arg("-i").arg(video)
            .arg("-vf").arg(subtitles_filter(subtitles))
            .arg("-c:v").arg("libx264")
            .arg("-preset").arg(&self.preset)
            .arg("-crf").arg(self.crf.to_string())
            .arg("-c:a").arg("copy")
            .arg("-y")
            .arg(output)
    }

    /// Extract the audio track of `input` into `output`.
    #[instrument(skip(self), fields(input = %input.display()))]
    pub async fn extract_audio(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        let command = self.extract_audio_command(input, output);
        let run = run_tool(&command, self.audio_timeout, PipelineStage::AudioExtraction).await?;
        ensure_output(output, PipelineStage::AudioExtraction).await?;

        info!(elapsed_ms = run.elapsed.as_millis() as u64, "Audio extracted");
        Ok(output.to_path_buf())
    }

    /// Burn `subtitles` into `video`, writing the result to `output`.
    #[instrument(skip(self), fields(video = %video.display()))]
    pub async fn burn_subtitles(&self, video: &Path, subtitles: &Path, output: &Path) -> Result<PathBuf> {
        let command = self.burn_subtitles_command(video, subtitles, output);
        let run = run_tool(&command, self.burn_timeout, PipelineStage::SubtitleBurn).await?;
        ensure_output(output, PipelineStage::SubtitleBurn).await?;

        info!(elapsed_ms = run.elapsed.as_millis() as u64, "Subtitles burned");
        Ok(output.to_path_buf())
    }
}

/// Fail if the tool reported success but the declared output is absent.
async fn ensure_output(path: &Path, stage: PipelineStage) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(TekstingError::MissingOutput {
            stage,
            path: path.to_path_buf(),
        }),
    }
}
