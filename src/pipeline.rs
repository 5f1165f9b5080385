//! Media transformation pipeline.
//!
//! Coordinates staging, validation, ffmpeg and the speech model for each
//! request. Every operation opens a [`StagingSession`] and releases it before
//! returning, on success and on every error path.

use crate::config::Settings;
use crate::error::Result;
use crate::staging::{upload_extension, FilePurpose, StagingArea, StagingSession};
use crate::subtitle::SubtitleDocument;
use crate::transcode::Transcoder;
use crate::transcription::{build_loader, ModelCache, ModelSpec, TranscriptResult, TranscriptionAdapter};
use crate::upload::{Upload, UploadedParts};
use crate::validation::{
    decode_subtitle_bytes, persist_subtitles, require_parts, require_upload, verify_subtitle_file,
};
use axum::body::Bytes;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Multipart field carrying audio for transcription.
pub const AUDIO_FIELD: &str = "audio_file";
/// Multipart field carrying the source video.
pub const VIDEO_FIELD: &str = "video";
/// Multipart field carrying SRT subtitles.
pub const SUBTITLES_FIELD: &str = "subtitles";

/// Content of a downloadable result.
#[derive(Debug)]
pub enum ArtifactBody {
    /// Small generated text.
    Memory(Bytes),
    /// A staged output file opened before staging was released. The open
    /// handle keeps the data readable after the path is unlinked.
    File { file: tokio::fs::File, len: u64 },
}

/// A downloadable result that outlives the request's staging session.
#[derive(Debug)]
pub struct Artifact {
    pub body: ArtifactBody,
    pub content_type: &'static str,
    pub filename: &'static str,
}

impl Artifact {
    /// Open a staged output file for streaming.
    async fn open(path: &Path, content_type: &'static str, filename: &'static str) -> Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        Ok(Self {
            body: ArtifactBody::File { file, len },
            content_type,
            filename,
        })
    }
}

/// The pipeline shared by all request handlers.
#[derive(Clone)]
pub struct Pipeline {
    staging: StagingArea,
    transcoder: Transcoder,
    transcriber: TranscriptionAdapter,
}

impl Pipeline {
    pub fn new(staging: StagingArea, transcoder: Transcoder, transcriber: TranscriptionAdapter) -> Self {
        Self {
            staging,
            transcoder,
            transcriber,
        }
    }

    /// Wire up the pipeline from settings, creating the temp directory.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let staging = StagingArea::new(settings.temp_dir())?;
        let transcoder = Transcoder::from_settings(&settings.transcode);
        let cache = Arc::new(ModelCache::new(build_loader(settings), ModelSpec::from_settings(settings)));
        let transcriber = TranscriptionAdapter::new(cache).with_language(&settings.transcription.language);

        Ok(Self::new(staging, transcoder, transcriber))
    }

    /// Transcribe the `audio_file` upload.
    #[instrument(skip_all)]
    pub async fn transcribe(&self, parts: &UploadedParts) -> Result<TranscriptResult> {
        let upload = require_upload(parts, AUDIO_FIELD)?;

        let mut session = self.begin();
        let result = self.transcribe_staged(&mut session, upload).await;
        finish(session, result)
    }

    /// Transcribe the `audio_file` upload and render it as SRT.
    #[instrument(skip_all)]
    pub async fn transcribe_to_srt(&self, parts: &UploadedParts) -> Result<Artifact> {
        let result = self.transcribe(parts).await?;
        let srt = SubtitleDocument::from_segments(&result.segments).to_srt();

        Ok(Artifact {
            body: ArtifactBody::Memory(Bytes::from(srt)),
            content_type: "text/plain; charset=utf-8",
            filename: "subtitles.srt",
        })
    }

    /// Extract a mono 16 kHz WAV track from the `video` upload.
    #[instrument(skip_all)]
    pub async fn extract_audio(&self, parts: &UploadedParts) -> Result<Artifact> {
        let video = require_upload(parts, VIDEO_FIELD)?;

        let mut session = self.begin();
        let result = self.extract_audio_staged(&mut session, video).await;
        finish(session, result)
    }

    /// Burn the `subtitles` upload into the `video` upload.
    #[instrument(skip_all)]
    pub async fn burn_subtitles(&self, parts: &UploadedParts) -> Result<Artifact> {
        require_parts(parts, &[VIDEO_FIELD, SUBTITLES_FIELD])?;
        let video = require_upload(parts, VIDEO_FIELD)?;
        let subtitles = require_upload(parts, SUBTITLES_FIELD)?;

        let mut session = self.begin();
        let result = self.burn_subtitles_staged(&mut session, video, subtitles).await;
        finish(session, result)
    }

    fn begin(&self) -> StagingSession {
        let session = self.staging.session();
        info!(request_id = %session.request_id(), "Pipeline started");
        session
    }

    async fn transcribe_staged(&self, session: &mut StagingSession, upload: &Upload) -> Result<TranscriptResult> {
        let input = session.allocate(FilePurpose::Input, &upload_extension(upload.filename(), "bin"));
        let audio = session.allocate(FilePurpose::AudioOutput, "wav");

        tokio::fs::write(&input.path, &upload.bytes).await?;
        self.transcoder.extract_audio(&input.path, &audio.path).await?;
        self.transcriber.transcribe(&audio.path).await
    }

    async fn extract_audio_staged(&self, session: &mut StagingSession, video: &Upload) -> Result<Artifact> {
        let input = session.allocate(FilePurpose::Input, &upload_extension(video.filename(), "mp4"));
        let audio = session.allocate(FilePurpose::AudioOutput, "wav");

        tokio::fs::write(&input.path, &video.bytes).await?;
        self.transcoder.extract_audio(&input.path, &audio.path).await?;

        Artifact::open(&audio.path, "audio/wav", "audio.wav").await
    }

    async fn burn_subtitles_staged(
        &self,
        session: &mut StagingSession,
        video: &Upload,
        subtitles: &Upload,
    ) -> Result<Artifact> {
        let input = session.allocate(FilePurpose::Input, &upload_extension(video.filename(), "mp4"));
        let srt = session.allocate(FilePurpose::SubtitleInput, "srt");
        let output = session.allocate(FilePurpose::VideoOutput, "mp4");

        let text = decode_subtitle_bytes(&subtitles.bytes);
        persist_subtitles(&text, &srt.path).await?;
        verify_subtitle_file(&srt.path).await?;

        tokio::fs::write(&input.path, &video.bytes).await?;
        self.transcoder.burn_subtitles(&input.path, &srt.path, &output.path).await?;

        Artifact::open(&output.path, "video/mp4", "video_with_subtitles.mp4").await
    }
}

/// Release the session and log the outcome.
fn finish<T>(mut session: StagingSession, result: Result<T>) -> Result<T> {
    let request_id = session.request_id();
    session.release_all();

    match &result {
        Ok(_) => info!(%request_id, "Pipeline finished"),
        Err(e) => warn!(%request_id, stage = %e.stage(), error = %e, "Pipeline failed"),
    }
    result
}
