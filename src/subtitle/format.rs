//! SRT timestamp encoding.

use regex::Regex;
use std::sync::LazyLock;

static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2,}):(\d{2}):(\d{2}),(\d{3})$").expect("valid regex"));

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
///
/// Every component is truncated, never rounded, so milliseconds stay below
/// 1000. Hours are not wrapped at 24 and simply grow wider.
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let hours = (seconds / 3600.0).floor() as u64;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    let millis = ((seconds % 1.0) * 1000.0).floor() as u64;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis.min(999))
}

/// Parse an SRT timestamp back into seconds.
pub fn parse_timestamp(timestamp: &str) -> Option<f64> {
    let caps = TIMESTAMP.captures(timestamp.trim())?;
    let field = |i: usize| caps.get(i)?.as_str().parse::<u64>().ok();

    let hours = field(1)?;
    let minutes = field(2)?;
    let secs = field(3)?;
    let millis = field(4)?;

    if minutes > 59 || secs > 59 {
        return None;
    }

    Some((hours * 3600 + minutes * 60 + secs) as f64 + millis as f64 / 1000.0)
}
