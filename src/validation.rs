//! Upload validation run before any external tool sees request data.
//!
//! Checks run in a fixed order: required parts present, non-empty filenames,
//! lossless-or-Latin-1 decoding of subtitle bytes, and after the subtitles are
//! persisted a single flush-and-verify step that re-reads the file from disk
//! and inspects its head for SRT timing arrows and leaked reasoning tags.

use crate::error::{Result, TekstingError};
use crate::upload::{Upload, UploadedParts};
use regex::Regex;
use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Characters of subtitle content inspected for format markers.
pub const HEAD_CHARS: usize = 1000;

/// Longest excerpt of offending content echoed back in an error.
pub const PREVIEW_CHARS: usize = 300;

/// SRT timing-line separator.
pub const TIMING_ARROW: &str = "-->";

static THINKING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?think(ing)?>").expect("valid regex"));

/// Require every named part to exist, before any filename is looked at.
pub fn require_parts(parts: &UploadedParts, fields: &[&str]) -> Result<()> {
    for field in fields {
        require_part(parts, field)?;
    }
    Ok(())
}

fn require_part<'a>(parts: &'a UploadedParts, field: &str) -> Result<&'a Upload> {
    parts
        .get(field)
        .ok_or_else(|| TekstingError::MissingInput(format!("file field '{}' not found", field)))
}

/// Return the named part, requiring it to exist and carry a filename.
pub fn require_upload<'a>(parts: &'a UploadedParts, field: &str) -> Result<&'a Upload> {
    let upload = require_part(parts, field)?;

    if upload.filename().trim().is_empty() {
        return Err(TekstingError::MissingInput(format!(
            "no file selected for field '{}'",
            field
        )));
    }

    Ok(upload)
}

/// Decode subtitle bytes as UTF-8, falling back to Latin-1.
///
/// Never fails: every byte sequence is valid Latin-1.
pub fn decode_subtitle_bytes(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            debug!("Subtitle upload is not UTF-8, decoding as Latin-1");
            Cow::Owned(bytes.iter().map(|&b| b as char).collect())
        }
    }
}

/// Write subtitle text as UTF-8 and flush it to disk.
pub async fn persist_subtitles(text: &str, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(text.as_bytes()).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

/// Verify a persisted subtitle file is non-empty, independently readable and
/// looks like SRT. Returns the inspected head of the file.
pub async fn verify_subtitle_file(path: &Path) -> Result<String> {
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|e| TekstingError::StagingUnreadable(format!("{}: {}", path.display(), e)))?
        .len();

    if size == 0 {
        return Err(TekstingError::Validation("subtitle file is empty".to_string()));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| TekstingError::StagingUnreadable(format!("{}: {}", path.display(), e)))?;

    let head: String = String::from_utf8_lossy(&bytes).chars().take(HEAD_CHARS).collect();
    if head.is_empty() {
        return Err(TekstingError::StagingUnreadable(format!(
            "{} read back empty",
            path.display()
        )));
    }

    check_subtitle_head(&head)?;
    Ok(head)
}

/// Content checks on the first [`HEAD_CHARS`] characters of subtitle text.
pub fn check_subtitle_head(text: &str) -> Result<()> {
    let head: String = text.chars().take(HEAD_CHARS).collect();

    if !head.contains(TIMING_ARROW) {
        return Err(TekstingError::Validation(format!(
            "subtitles are not in SRT format (no '{}' timing lines); content: {}",
            TIMING_ARROW,
            preview(&head)
        )));
    }

    if THINKING_TAG.is_match(&head) {
        return Err(TekstingError::Validation(format!(
            "subtitles contain model reasoning tags instead of clean SRT; content: {}",
            preview(&head)
        )));
    }

    Ok(())
}

/// Bounded excerpt of `text` for diagnostics.
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRT: &str = "1\n00:00:00,000 --> 00:00:02,500\nHello\n\n";

    #[test]
    fn test_missing_part() {
        let parts = UploadedParts::new().with("video", Upload::new("a.mp4", b"x".to_vec()));
        let err = require_upload(&parts, "subtitles").unwrap_err();
        assert!(matches!(err, TekstingError::MissingInput(ref m) if m.contains("subtitles")));
    }

    #[test]
    fn test_empty_filename() {
        let parts = UploadedParts::new()
            .with("video", Upload::new("", b"x".to_vec()))
            .with(
                "audio_file",
                Upload {
                    filename: None,
                    bytes: b"x".to_vec().into(),
                },
            );
        assert!(matches!(require_upload(&parts, "video"), Err(TekstingError::MissingInput(_))));
        assert!(matches!(require_upload(&parts, "audio_file"), Err(TekstingError::MissingInput(_))));
    }

    #[test]
    fn test_presence_checked_before_filenames() {
        let parts = UploadedParts::new().with("video", Upload::new("", b"x".to_vec()));
        let err = require_parts(&parts, &["video", "subtitles"]).unwrap_err();
        assert!(matches!(err, TekstingError::MissingInput(ref m) if m.contains("'subtitles' not found")));

        let both = parts.with("subtitles", Upload::new("s.srt", b"x".to_vec()));
        assert!(require_parts(&both, &["video", "subtitles"]).is_ok());
    }

    #[test]
    fn test_present_part() {
        let parts = UploadedParts::new().with("video", Upload::new("clip.mp4", b"data".to_vec()));
        assert_eq!(require_upload(&parts, "video").unwrap().filename(), "clip.mp4");
    }

    #[test]
    fn test_decode_utf8() {
        let decoded = decode_subtitle_bytes("Привет -->".as_bytes());
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert_eq!(decoded, "Привет -->");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // "café" in Latin-1 is invalid UTF-8
        let decoded = decode_subtitle_bytes(&[b'c', b'a', b'f', 0xE9]);
        assert_eq!(decoded, "café");
    }

    #[test]
    fn test_valid_srt_head() {
        assert!(check_subtitle_head(SRT).is_ok());
    }

    #[test]
    fn test_reasoning_instead_of_srt() {
        let text = "<think>The user wants subtitles, let me think about timing.</think>";
        let err = check_subtitle_head(text).unwrap_err();
        assert!(matches!(err, TekstingError::Validation(ref m) if m.contains("not in SRT format")));
    }

    #[test]
    fn test_thinking_tag_alongside_srt() {
        let text = format!("<think>ok</think>\n{}", SRT);
        let err = check_subtitle_head(&text).unwrap_err();
        assert!(matches!(err, TekstingError::Validation(ref m) if m.contains("reasoning tags")));

        let late = format!("{}{}<THINK>", SRT, "a".repeat(500));
        assert!(check_subtitle_head(&late).is_err());
    }

    #[test]
    fn test_markers_past_head_are_not_seen() {
        let text = format!("{}{}", "x".repeat(HEAD_CHARS), SRT);
        assert!(check_subtitle_head(&text).is_err());

        let tag_after_head = format!("{}{}<think>", SRT, "y".repeat(HEAD_CHARS));
        assert!(check_subtitle_head(&tag_after_head).is_ok());
    }

    #[test]
    fn test_preview_is_bounded() {
        let text = "я".repeat(5000);
        let err = check_subtitle_head(&text).unwrap_err().to_string();
        let echoed = err.rsplit("content: ").next().unwrap();
        assert_eq!(echoed.chars().count(), PREVIEW_CHARS);
    }

    #[tokio::test]
    async fn test_persist_and_verify() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subtitles.srt");

        persist_subtitles(SRT, &path).await.unwrap();
        let head = verify_subtitle_file(&path).await.unwrap();
        assert_eq!(head, SRT);
    }

    #[tokio::test]
    async fn test_verify_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subtitles.srt");

        persist_subtitles("", &path).await.unwrap();
        let err = verify_subtitle_file(&path).await.unwrap_err();
        assert!(matches!(err, TekstingError::Validation(ref m) if m.contains("empty")));
    }

    #[tokio::test]
    async fn test_verify_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify_subtitle_file(&dir.path().join("gone.srt")).await.unwrap_err();
        assert!(matches!(err, TekstingError::StagingUnreadable(_)));
    }
}
