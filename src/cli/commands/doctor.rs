//! Doctor command - verify external tools, model files and directories.

use crate::cli::preflight::tool_version;
use crate::cli::Output;
use crate::config::{Settings, TranscriptionBackend};
use crate::transcription::resolve_model_path;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Teksting Doctor");
    println!();
    println!("Checking external tools and configuration...\n");

    let mut checks = Vec::new();

    let tools = vec![check_tool("ffmpeg", &settings.transcode.ffmpeg_binary, install_hint_ffmpeg())];
    print_section("External Tools", &tools);
    checks.extend(tools);

    let transcription = check_transcription(settings);
    print_section(
        &format!("Transcription ({})", settings.transcription.backend),
        &transcription,
    );
    checks.extend(transcription);

    let dirs = vec![check_temp_dir(&settings.temp_dir())];
    print_section("Directories", &dirs);
    checks.extend(dirs);

    let config = vec![check_config_file(config_path)];
    print_section("Configuration", &config);
    checks.extend(config);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Requests touching these will fail.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Teksting is ready to serve.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, binary: &str, hint: &str) -> CheckResult {
    match tool_version(binary) {
        Ok(version) => CheckResult::ok(name, &version),
        Err(e) => CheckResult::error(name, &e.to_string(), hint),
    }
}

fn check_transcription(settings: &Settings) -> Vec<CheckResult> {
    let t = &settings.transcription;
    match t.backend {
        TranscriptionBackend::WhisperCpp => {
            let mut results = vec![check_tool(
                "whisper.cpp",
                &t.whisper_binary,
                "Build whisper.cpp and put whisper-cli on PATH (or set WHISPER_BIN)",
            )];
            results.push(check_model_file(&resolve_model_path(&settings.models_dir(), &t.model_size)));
            if t.device != "cpu" {
                results.push(CheckResult::ok(
                    "Device",
                    &format!("{} (GPU offload left to whisper.cpp)", t.device),
                ));
            }
            results
        }
        TranscriptionBackend::OpenAi => vec![check_openai_api_key()],
    }
}

fn check_model_file(path: &Path) -> CheckResult {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => CheckResult::ok(
            "Model",
            &format!("{} ({})", path.display(), format_size(meta.len())),
        ),
        _ => CheckResult::error(
            "Model",
            &format!("{} not found", path.display()),
            "Download with whisper.cpp's models/download-ggml-model.sh (or set WHISPER_MODELS_DIR)",
        ),
    }
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// The temp directory must exist and accept writes.
fn check_temp_dir(dir: &Path) -> CheckResult {
    if !dir.exists() {
        return CheckResult::warning(
            "Temp directory",
            &format!("{} (will be created)", dir.display()),
            "Directory is created when the server starts",
        );
    }

    let probe = dir.join(format!(".teksting-doctor-{}", std::process::id()));
    match std::fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            CheckResult::ok("Temp directory", &format!("{} (writable)", dir.display()))
        }
        Err(e) => CheckResult::error(
            "Temp directory",
            &format!("{} is not writable: {}", dir.display(), e),
            "Fix permissions or set TEMP_DIR",
        ),
    }
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: teksting config init",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or set FFMPEG_PATH)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
