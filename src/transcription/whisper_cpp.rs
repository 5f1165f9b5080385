//! Local transcription with the whisper.cpp command-line binary.

use super::{DecodeOptions, ModelLoader, ModelSpec, SpeechModel, TranscriptResult, TranscriptSegment};
use crate::error::{PipelineStage, Result, TekstingError};
use crate::transcode::{run_tool, ToolCommand};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Time allowed for the binary to answer `--help` at load time.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolve a size selector to a ggml model file.
///
/// A selector that already looks like a file (`*.bin` or containing a path
/// separator) is used as-is, otherwise `ggml-<size>.bin` in `models_dir`.
pub fn resolve_model_path(models_dir: &Path, size: &str) -> PathBuf {
    if size.ends_with(".bin") || size.contains('/') || size.contains('\\') {
        PathBuf::from(shellexpand::tilde(size).to_string())
    } else {
        models_dir.join(format!("ggml-{}.bin", size))
    }
}

/// Loads whisper.cpp models from a directory of ggml files.
pub struct WhisperCppLoader {
    binary: String,
    models_dir: PathBuf,
    threads: Option<u32>,
    timeout: Duration,
}

impl WhisperCppLoader {
    pub fn new(binary: &str, models_dir: PathBuf, threads: Option<u32>, timeout: Duration) -> Self {
        Self {
            binary: binary.to_string(),
            models_dir,
            threads,
            timeout,
        }
    }
}

#[async_trait]
impl ModelLoader for WhisperCppLoader {
    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn SpeechModel>> {
        let model_path = resolve_model_path(&self.models_dir, &spec.size);

        match tokio::fs::metadata(&model_path).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                return Err(TekstingError::ModelLoad(format!(
                    "model file not found: {}",
                    model_path.display()
                )));
            }
        }

        let probe = ToolCommand::new(&self.binary).arg("--help");
        run_tool(&probe, PROBE_TIMEOUT, PipelineStage::Transcription)
            .await
            .map_err(|e| TekstingError::ModelLoad(format!("{} is not usable: {}", self.binary, e)))?;

        Ok(Arc::new(WhisperCppModel {
            binary: self.binary.clone(),
            model_path,
            use_gpu: !spec.cpu_only(),
            threads: self.threads,
            timeout: self.timeout,
        }))
    }
}

/// A ggml model bound to the whisper.cpp binary.
#[derive(Debug)]
pub struct WhisperCppModel {
    binary: String,
    model_path: PathBuf,
    use_gpu: bool,
    threads: Option<u32>,
    timeout: Duration,
}

impl WhisperCppModel {
    /// Build the invocation writing JSON to `<output_prefix>.json`.
    pub fn command(&self, audio_path: &Path, output_prefix: &Path, options: &DecodeOptions) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.binary)
            .arg("-m").arg(&self.model_path)
            .arg("-f").arg(audio_path)
            .arg("-l").arg(&options.language)
            .arg("-oj")
            .arg("-of").arg(output_prefix)
            .arg("-np");

        if !self.use_gpu {
            cmd = cmd.arg("-ng");
        }
        if let Some(threads) = self.threads {
            cmd = cmd.arg("-t").arg(threads.to_string());
        }
        cmd
    }
}

#[async_trait]
impl SpeechModel for WhisperCppModel {
    #[instrument(skip(self, options), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<TranscriptResult> {
        let output = JsonOutput::beside(audio_path);
        let command = self.command(audio_path, &output.prefix, options);

        run_tool(&command, self.timeout, PipelineStage::Transcription).await?;

        let raw = tokio::fs::read(&output.json_path).await.map_err(|e| {
            TekstingError::Transcription(format!("whisper output missing: {}", e))
        })?;
        let parsed: WhisperJson = serde_json::from_slice(&raw)
            .map_err(|e| TekstingError::Transcription(format!("invalid whisper output: {}", e)))?;

        debug!(segments = parsed.transcription.len(), "Parsed whisper output");
        Ok(parsed.into_result(&options.language))
    }

    fn describe(&self) -> String {
        format!(
            "whisper.cpp {} ({})",
            self.model_path.display(),
            if self.use_gpu { "gpu" } else { "cpu" }
        )
    }
}

/// JSON file produced next to the audio; removed when dropped.
struct JsonOutput {
    prefix: PathBuf,
    json_path: PathBuf,
}

impl JsonOutput {
    fn beside(audio_path: &Path) -> Self {
        let mut prefix = audio_path.as_os_str().to_owned();
        prefix.push(".whisper");
        let prefix = PathBuf::from(prefix);
        let json_path = prefix.with_extension("whisper.json");
        Self { prefix, json_path }
    }
}

impl Drop for JsonOutput {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.json_path);
    }
}

#[derive(Debug, Deserialize)]
struct WhisperJson {
    #[serde(default)]
    result: Option<WhisperResultInfo>,
    #[serde(default)]
    transcription: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperResultInfo {
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    offsets: WhisperOffsets,
    #[serde(default)]
    text: String,
}

/// Millisecond offsets from the start of the audio.
#[derive(Debug, Deserialize)]
struct WhisperOffsets {
    from: u64,
    to: u64,
}

impl WhisperJson {
    fn into_result(self, fallback_language: &str) -> TranscriptResult {
        let language = self
            .result
            .and_then(|r| r.language)
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| fallback_language.to_string());

        let segments = self
            .transcription
            .into_iter()
            .map(|s| {
                let start = s.offsets.from as f64 / 1000.0;
                let end = (s.offsets.to.max(s.offsets.from)) as f64 / 1000.0;
                TranscriptSegment::new(start, end, s.text)
            })
            .collect();

        TranscriptResult::from_raw_segments(language, segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "systeminfo": "AVX = 1",
        "result": { "language": "en" },
        "transcription": [
            {
                "timestamps": { "from": "00:00:00,000", "to": "00:00:02,500" },
                "offsets": { "from": 0, "to": 2500 },
                "text": " And so my fellow Americans,"
            },
            {
                "timestamps": { "from": "00:00:02,500", "to": "00:00:05,120" },
                "offsets": { "from": 2500, "to": 5120 },
                "text": " ask not."
            }
        ]
    }"#;

    fn model(use_gpu: bool, threads: Option<u32>) -> WhisperCppModel {
        WhisperCppModel {
            binary: "whisper-cli".into(),
            model_path: PathBuf::from("/models/ggml-base.bin"),
            use_gpu,
            threads,
            timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_parse_output() {
        let parsed: WhisperJson = serde_json::from_str(SAMPLE).unwrap();
        let result = parsed.into_result("en");

        assert_eq!(result.language, "en");
        assert_eq!(result.full_text, "And so my fellow Americans, ask not.");
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[1].start_seconds, 2.5);
        assert_eq!(result.segments[1].end_seconds, 5.12);
        assert_eq!(result.segments[1].text, "ask not.");
    }

    #[test]
    fn test_parse_minimal_output() {
        let parsed: WhisperJson = serde_json::from_str(r#"{"transcription": []}"#).unwrap();
        let result = parsed.into_result("en");
        assert_eq!(result.language, "en");
        assert!(result.segments.is_empty());
    }

    #[test]
    fn test_resolve_model_path() {
        let dir = Path::new("/models");
        assert_eq!(resolve_model_path(dir, "base"), PathBuf::from("/models/ggml-base.bin"));
        assert_eq!(resolve_model_path(dir, "large-v3"), PathBuf::from("/models/ggml-large-v3.bin"));
        assert_eq!(
            resolve_model_path(dir, "/opt/ggml-custom.bin"),
            PathBuf::from("/opt/ggml-custom.bin")
        );
    }

    #[test]
    fn test_command_cpu() {
        let cmd = model(false, Some(4)).command(
            Path::new("/t/audio_1.wav"),
            Path::new("/t/audio_1.wav.whisper"),
            &DecodeOptions::default(),
        );
        let args: Vec<String> = cmd.args().iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert!(args.windows(2).any(|w| w == ["-l", "en"]));
        assert!(args.windows(2).any(|w| w == ["-f", "/t/audio_1.wav"]));
        assert!(args.windows(2).any(|w| w == ["-t", "4"]));
        assert!(args.contains(&"-ng".to_string()));
        assert!(!args.contains(&"-tr".to_string()));
    }

    #[test]
    fn test_command_gpu() {
        let cmd = model(true, None).command(Path::new("a.wav"), Path::new("a"), &DecodeOptions::default());
        let args: Vec<String> = cmd.args().iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(!args.contains(&"-ng".to_string()));
        assert!(!args.contains(&"-t".to_string()));
    }

    #[test]
    fn test_json_output_location() {
        let out = JsonOutput::beside(Path::new("/t/audio_1.wav"));
        assert_eq!(out.prefix, PathBuf::from("/t/audio_1.wav.whisper"));
        assert_eq!(out.json_path, PathBuf::from("/t/audio_1.wav.whisper.json"));
    }

    #[tokio::test]
    async fn test_load_missing_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = WhisperCppLoader::new("whisper-cli", dir.path().to_path_buf(), None, Duration::from_secs(5));
        let spec = ModelSpec {
            size: "tiny".into(),
            device: "cpu".into(),
        };

        let err = loader.load(&spec).await.err().unwrap();
        assert!(matches!(err, TekstingError::ModelLoad(ref m) if m.contains("ggml-tiny.bin")));
    }
}
