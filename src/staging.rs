//! Request-scoped temporary file staging.
//!
//! Every request gets a fresh [`RequestId`]; every file it stages lives in the
//! shared working directory under a name that embeds both the purpose and the
//! request id, so concurrent requests never collide. A [`StagingSession`]
//! tracks what it allocated and deletes all of it when released or dropped.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Unique token identifying one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What a staged file is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilePurpose {
    Input,
    AudioOutput,
    SubtitleInput,
    VideoOutput,
}

impl FilePurpose {
    fn prefix(self) -> &'static str {
        match self {
            FilePurpose::Input => "input",
            FilePurpose::AudioOutput => "audio",
            FilePurpose::SubtitleInput => "subtitles",
            FilePurpose::VideoOutput => "output",
        }
    }
}

/// A file placed in the working directory for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub purpose: FilePurpose,
    pub request_id: RequestId,
}

/// The shared working directory all requests stage into.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Use `root` as the working directory, creating it if absent.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the location for a purpose within a request.
    ///
    /// `extension` is given without the leading dot.
    pub fn allocate(&self, purpose: FilePurpose, request_id: RequestId, extension: &str) -> StagedFile {
        let name = format!("{}_{}.{}", purpose.prefix(), request_id, extension);
        StagedFile {
            path: self.root.join(name),
            purpose,
            request_id,
        }
    }

    /// Open a session that owns the cleanup of everything it allocates.
    pub fn session(&self) -> StagingSession {
        StagingSession {
            area: self.clone(),
            request_id: RequestId::new(),
            files: Vec::new(),
        }
    }
}

/// Best-effort deletion of every path, each attempted exactly once.
///
/// Missing files and deletion errors are logged and swallowed.
pub fn release_all<'a, I>(files: I)
where
    I: IntoIterator<Item = &'a StagedFile>,
{
    for file in files {
        match std::fs::remove_file(&file.path) {
            Ok(()) => debug!(path = %file.path.display(), "Released staged file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!(path = %file.path.display(), error = %e, "Could not release staged file"),
        }
    }
}

/// Files allocated for one request, released together.
#[derive(Debug)]
pub struct StagingSession {
    area: StagingArea,
    request_id: RequestId,
    files: Vec<StagedFile>,
}

impl StagingSession {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Allocate a file for `purpose` and register it for cleanup.
    pub fn allocate(&mut self, purpose: FilePurpose, extension: &str) -> StagedFile {
        let file = self.area.allocate(purpose, self.request_id, extension);
        self.files.push(file.clone());
        file
    }

    /// Paths currently registered with this session.
    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    /// Delete every registered file. Never fails.
    #[instrument(skip(self), fields(request_id = %self.request_id))]
    pub fn release_all(&mut self) {
        let files = std::mem::take(&mut self.files);
        release_all(&files);
    }
}

impl Drop for StagingSession {
    fn drop(&mut self) {
        if !self.files.is_empty() {
            self.release_all();
        }
    }
}

/// Reduce an uploaded filename to a safe extension for the staged copy.
///
/// Only short ASCII-alphanumeric extensions survive; anything else yields `fallback`.
pub fn upload_extension(filename: &str, fallback: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| fallback.to_string())
}
