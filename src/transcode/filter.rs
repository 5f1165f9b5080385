//! Filter-graph argument escaping.
//!
//! A path embedded in an ffmpeg filter expression (`subtitles=<path>`) is
//! parsed by the filter-graph grammar, not by a shell. There `:` separates
//! options, `,` separates filters and `[`/`]` delimit link labels, so each must
//! be escaped. Backslashes are turned into forward slashes first so Windows
//! separators are not mistaken for escapes.

use std::path::Path;

/// Escape a path for use as a single filter-graph argument.
pub fn escape_filter_path(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let mut escaped = String::with_capacity(normalized.len() + 8);

    for c in normalized.chars() {
        if matches!(c, ':' | '[' | ']' | ',') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

/// Build the `subtitles=` video filter for a subtitle file.
pub fn subtitles_filter(subtitle_path: &Path) -> String {
    format!("subtitles={}", escape_filter_path(subtitle_path))
}
