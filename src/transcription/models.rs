//! Data models for transcription.

use serde::{Deserialize, Serialize};

/// A single segment of a transcript with timestamp information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Transcribed text content.
    pub text: String,
}

impl TranscriptSegment {
    /// Create a new transcript segment.
    pub fn new(start_seconds: f64, end_seconds: f64, text: String) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text,
        }
    }
}

/// Full output of one transcription run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// Trimmed full transcript text.
    pub full_text: String,
    /// Language tag reported by the model.
    pub language: String,
    /// Segments ordered by start time.
    pub segments: Vec<TranscriptSegment>,
}

impl TranscriptResult {
    /// Build a result from raw model segments.
    ///
    /// Segment texts are trimmed individually; the full text is the raw
    /// concatenation trimmed once. Segments are ordered by start time.
    pub fn from_raw_segments(language: String, raw: Vec<TranscriptSegment>) -> Self {
        let full_text = raw
            .iter()
            .map(|s| s.text.as_str())
            .collect::<String>()
            .trim()
            .to_string();

        let mut segments: Vec<TranscriptSegment> = raw
            .into_iter()
            .map(|s| TranscriptSegment::new(s.start_seconds, s.end_seconds, s.text.trim().to_string()))
            .collect();
        segments.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));

        Self {
            full_text,
            language,
            segments,
        }
    }

    /// Total duration covered by the segments.
    pub fn duration_seconds(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.end_seconds)
            .fold(0.0, f64::max)
    }
}

/// JSON shape of a segment in the `/transcribe` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentExport {
    pub id: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// JSON shape of the `/transcribe` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptExport {
    pub text: String,
    pub language: String,
    pub segments: Vec<SegmentExport>,
}

impl From<&TranscriptResult> for TranscriptExport {
    fn from(result: &TranscriptResult) -> Self {
        Self {
            text: result.full_text.clone(),
            language: result.language.clone(),
            segments: result
                .segments
                .iter()
                .enumerate()
                .map(|(id, s)| SegmentExport {
                    id,
                    start: s.start_seconds,
                    end: s.end_seconds,
                    text: s.text.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_text_is_trimmed_concatenation() {
        let result = TranscriptResult::from_raw_segments(
            "en".to_string(),
            vec![
                TranscriptSegment::new(0.0, 1.0, " Hello".to_string()),
                TranscriptSegment::new(1.0, 2.0, " world.".to_string()),
            ],
        );

        assert_eq!(result.full_text, "Hello world.");
        assert_eq!(result.segments[0].text, "Hello");
        assert_eq!(result.segments[1].text, "world.");
        assert_eq!(result.duration_seconds(), 2.0);
    }

    #[test]
    fn test_segments_sorted_by_start() {
        let result = TranscriptResult::from_raw_segments(
            "en".to_string(),
            vec![
                TranscriptSegment::new(5.0, 6.0, "second".to_string()),
                TranscriptSegment::new(0.0, 1.0, "first".to_string()),
            ],
        );
        assert_eq!(result.segments[0].text, "first");
    }

    #[test]
    fn test_empty_transcript() {
        let result = TranscriptResult::from_raw_segments("en".to_string(), vec![]);
        assert_eq!(result.full_text, "");
        assert_eq!(result.duration_seconds(), 0.0);
    }

    #[test]
    fn test_export_shape() {
        let result = TranscriptResult::from_raw_segments(
            "en".to_string(),
            vec![TranscriptSegment::new(0.0, 2.5, "Hi".to_string())],
        );
        let json = serde_json::to_value(TranscriptExport::from(&result)).unwrap();

        assert_eq!(json["text"], "Hi");
        assert_eq!(json["language"], "en");
        assert_eq!(json["segments"][0]["id"], 0);
        assert_eq!(json["segments"][0]["end"], 2.5);
    }
}
