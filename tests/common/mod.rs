#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use teksting::pipeline::Pipeline;
use teksting::server::{create_router, AppState};
use teksting::staging::StagingArea;
use teksting::transcode::Transcoder;
use teksting::transcription::{
    DecodeOptions, ModelCache, ModelLoader, ModelSpec, SpeechModel, TranscriptResult,
    TranscriptSegment, TranscriptionAdapter,
};
use teksting::Result;

pub const BOUNDARY: &str = "teksting-test-boundary";
pub const MISSING_FFMPEG: &str = "/nonexistent/teksting-ffmpeg";
pub const BODY_LIMIT: usize = 16 * 1024 * 1024;

/// One multipart part: field name, optional filename, content.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub bytes: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, filename: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            bytes,
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Speech model returning fixed segments.
pub struct FixedModel {
    pub segments: Vec<(f64, f64, &'static str)>,
}

#[async_trait]
impl SpeechModel for FixedModel {
    async fn transcribe(&self, _audio_path: &Path, options: &DecodeOptions) -> Result<TranscriptResult> {
        let raw = self
            .segments
            .iter()
            .map(|(start, end, text)| TranscriptSegment::new(*start, *end, text.to_string()))
            .collect();
        Ok(TranscriptResult::from_raw_segments(options.language.clone(), raw))
    }

    fn describe(&self) -> String {
        "fixed".to_string()
    }
}

pub struct FixedLoader {
    pub loads: AtomicUsize,
}

impl FixedLoader {
    pub fn new() -> Self {
        Self {
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelLoader for FixedLoader {
    async fn load(&self, _spec: &ModelSpec) -> Result<Arc<dyn SpeechModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FixedModel {
            segments: vec![
                (0.0, 2.5, " Hello there. "),
                (2.5, 5.0, "General Kenobi."),
            ],
        }))
    }
}

pub struct TestApp {
    pub router: Router,
    pub temp_dir: tempfile::TempDir,
    pub loader: Arc<FixedLoader>,
}

impl TestApp {
    /// App whose ffmpeg is the given program path.
    pub fn new(ffmpeg: &str) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        Self::build(temp_dir, ffmpeg, Duration::from_secs(10), BODY_LIMIT)
    }

    /// App that rejects request bodies over `limit` bytes.
    pub fn with_body_limit(limit: usize) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        Self::build(temp_dir, MISSING_FFMPEG, Duration::from_secs(10), limit)
    }

    /// App whose ffmpeg is a shell script with the given body.
    #[cfg(unix)]
    pub fn with_script(body: &str, timeout: Duration) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("fake-ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let ffmpeg = path.display().to_string();
        Self::build(temp_dir, &ffmpeg, timeout, BODY_LIMIT)
    }

    fn build(temp_dir: tempfile::TempDir, ffmpeg: &str, timeout: Duration, body_limit: usize) -> Self {
        let loader = Arc::new(FixedLoader::new());

        let staging = StagingArea::new(temp_dir.path().join("staging")).unwrap();
        let transcoder = Transcoder::new(ffmpeg, timeout, timeout);
        let spec = ModelSpec {
            size: "base".to_string(),
            device: "cpu".to_string(),
        };
        let cache = Arc::new(ModelCache::new(loader.clone(), spec));
        let pipeline = Pipeline::new(staging, transcoder, TranscriptionAdapter::new(cache));

        let state = Arc::new(AppState::new(pipeline, "teksting-test"));
        let router = create_router(state, body_limit);

        Self {
            router,
            temp_dir,
            loader,
        }
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.temp_dir.path().join("staging")
    }

    /// Names of files left behind in the staging directory.
    pub fn leftover_files(&self) -> Vec<String> {
        std::fs::read_dir(self.staging_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}

/// Fake ffmpeg that writes a marker into its last argument (the output path).
pub const FAKE_FFMPEG: &str = "for last; do :; done\necho fake-output > \"$last\"";
