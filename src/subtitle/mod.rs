//! SubRip (SRT) subtitle documents.
//!
//! Converts timed transcript segments into numbered cues and renders them
//! in the `HH:MM:SS,mmm --> HH:MM:SS,mmm` wire format.

mod format;

pub use format::{format_timestamp, parse_timestamp};

use crate::transcription::TranscriptSegment;

/// A single numbered subtitle cue.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    /// 1-based position in the document.
    pub sequence_number: usize,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

impl Cue {
    /// Render as one SRT block, including the trailing blank line.
    pub fn to_srt(&self) -> String {
        format!(
            "{}\n{} --> {}\n{}\n\n",
            self.sequence_number,
            format_timestamp(self.start_seconds),
            format_timestamp(self.end_seconds),
            self.text
        )
    }
}

/// An ordered list of cues with contiguous 1-based numbering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtitleDocument {
    cues: Vec<Cue>,
}

impl SubtitleDocument {
    /// Build a document from segments, numbering cues in input order.
    ///
    /// Gaps and overlaps between segments are preserved as-is.
    pub fn from_segments(segments: &[TranscriptSegment]) -> Self {
        let cues = segments
            .iter()
            .enumerate()
            .map(|(i, segment)| Cue {
                sequence_number: i + 1,
                start_seconds: segment.start_seconds,
                end_seconds: segment.end_seconds,
                text: segment.text.clone(),
            })
            .collect();

        Self { cues }
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Render the whole document as SRT text.
    pub fn to_srt(&self) -> String {
        self.cues.iter().map(Cue::to_srt).collect()
    }
}
