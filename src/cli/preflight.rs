//! Pre-flight checks before serving requests.
//!
//! Reports missing external tools up front instead of on the first request
//! that needs them.

use crate::config::{Settings, TranscriptionBackend};
use crate::error::{Result, TekstingError};
use crate::transcription::resolve_model_path;
use std::process::Command;

/// Run `name` with its version/help flag and return the first output line.
pub fn tool_version(name: &str) -> Result<String> {
    // ffmpeg uses -version (single dash), whisper.cpp only knows --help
    let arg = match tool_stem(name).as_str() {
        "ffmpeg" | "ffprobe" => "-version",
        "whisper-cli" | "main" | "whisper" => "--help",
        _ => "--version",
    };

    match Command::new(name).arg(arg).output() {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let first = stdout
                .lines()
                .chain(stderr.lines())
                .find(|l| !l.trim().is_empty())
                .unwrap_or("installed")
                .trim()
                .chars()
                .take(60)
                .collect();
            Ok(first)
        }
        Ok(_) => Err(TekstingError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TekstingError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(TekstingError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

fn tool_stem(name: &str) -> String {
    std::path::Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

/// Problems that would make requests fail, as human-readable messages.
pub fn check(settings: &Settings) -> Vec<String> {
    let mut problems = Vec::new();

    if let Err(e) = tool_version(&settings.transcode.ffmpeg_binary) {
        problems.push(e.to_string());
    }

    match settings.transcription.backend {
        TranscriptionBackend::WhisperCpp => {
            if let Err(e) = tool_version(&settings.transcription.whisper_binary) {
                problems.push(e.to_string());
            }
            let model = resolve_model_path(&settings.models_dir(), &settings.transcription.model_size);
            if !model.is_file() {
                problems.push(format!("Model file not found: {}", model.display()));
            }
        }
        TranscriptionBackend::OpenAi => {
            if std::env::var("OPENAI_API_KEY").map(|k| k.is_empty()).unwrap_or(true) {
                problems.push("OPENAI_API_KEY not set".to_string());
            }
        }
    }

    problems
}
