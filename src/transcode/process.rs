//! Bounded execution of external command-line tools.

use crate::error::{PipelineStage, Result, TekstingError};
use std::ffi::OsString;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Longest stderr tail carried into an error message.
const MAX_DIAGNOSTIC_CHARS: usize = 2000;

/// A tool invocation: program plus a discrete argument list.
///
/// Arguments are never passed through a shell.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Name used in errors and logs (the file name of the program).
    pub fn tool_name(&self) -> String {
        std::path::Path::new(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.clone())
    }
}

/// Captured result of a successful run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Run `command` to completion within `timeout`.
///
/// The deadline covers the process exit and draining both pipes, so a
/// descendant that keeps stdout/stderr open cannot hold the request past it.
/// Non-zero exit becomes [`TekstingError::ToolFailed`] carrying the tail of
/// stderr. On timeout the tool's whole process group is killed and the child
/// reaped before [`TekstingError::ToolTimeout`] is returned.
#[instrument(skip_all, fields(tool = %command.tool_name(), stage = %stage))]
pub async fn run_tool(command: &ToolCommand, timeout: Duration, stage: PipelineStage) -> Result<ToolOutput> {
    let tool = command.tool_name();
    let started = Instant::now();

    debug!(args = ?command.args, "Spawning external tool");

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    new_process_group(&mut cmd);

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TekstingError::ToolNotFound(command.program.clone()));
        }
        Err(e) => {
            return Err(TekstingError::ToolFailed {
                tool,
                stage,
                diagnostics: format!("could not start: {e}"),
            });
        }
    };

    let mut group = ProcessGroup::new(child.id());
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let outcome = tokio::time::timeout(timeout, async {
        tokio::join!(child.wait(), drain(stdout_pipe), drain(stderr_pipe))
    })
    .await;

    let (status, stdout, stderr) = match outcome {
        Ok((status, stdout, stderr)) => (status?, stdout, stderr),
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "External tool timed out, killing it");
            group.kill();
            if let Err(e) = child.kill().await {
                debug!(error = %e, "Child already gone after group kill");
            }
            return Err(TekstingError::ToolTimeout {
                tool,
                stage,
                seconds: timeout.as_secs(),
            });
        }
    };
    group.disarm();

    let stdout = String::from_utf8_lossy(&stdout).into_owned();
    let stderr = String::from_utf8_lossy(&stderr).into_owned();
    let elapsed = started.elapsed();

    if !status.success() {
        let diagnostics = match diagnostic_tail(&stderr) {
            tail if tail.is_empty() => format!("exited with {status}"),
            tail => tail,
        };
        return Err(TekstingError::ToolFailed {
            tool,
            stage,
            diagnostics,
        });
    }

    debug!(elapsed_ms = elapsed.as_millis() as u64, "External tool finished");
    Ok(ToolOutput {
        stdout,
        stderr,
        elapsed,
    })
}

#[cfg(unix)]
fn new_process_group(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn new_process_group(_cmd: &mut Command) {}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

/// The process group a tool runs in, killed when dropped while armed.
///
/// `kill_on_drop` only reaches the direct child; this also reaches anything
/// it spawned, including when the request future is cancelled.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    // SAFETY: kill(2) with a negative pid only signals that process group
    let rc = unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
    if rc != 0 {
        debug!(pgid, error = %std::io::Error::last_os_error(), "Process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Keep the last part of the tool's stderr, where the actual error lives.
fn diagnostic_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= MAX_DIAGNOSTIC_CHARS {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(count - MAX_DIAGNOSTIC_CHARS).collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_name_strips_directories() {
        assert_eq!(ToolCommand::new("/usr/local/bin/ffmpeg").tool_name(), "ffmpeg");
        assert_eq!(ToolCommand::new("ffmpeg").tool_name(), "ffmpeg");
    }

    #[test]
    fn test_diagnostic_tail_is_bounded() {
        let long = "x".repeat(5000) + "the real error";
        let tail = diagnostic_tail(&long);
        assert!(tail.ends_with("the real error"));
        assert_eq!(tail.chars().count(), MAX_DIAGNOSTIC_CHARS + 3);
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let cmd = ToolCommand::new("teksting-no-such-tool-xyz").arg("-version");
        let err = run_tool(&cmd, Duration::from_secs(5), PipelineStage::AudioExtraction)
            .await
            .unwrap_err();
        assert!(matches!(err, TekstingError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_captures_stderr() {
        let cmd = ToolCommand::new("sh")
            .arg("-c")
            .arg("echo 'Invalid data found when processing input' >&2; exit 1");
        let err = run_tool(&cmd, Duration::from_secs(5), PipelineStage::AudioExtraction)
            .await
            .unwrap_err();

        match err {
            TekstingError::ToolFailed { tool, stage, diagnostics } => {
                assert_eq!(tool, "sh");
                assert_eq!(stage, PipelineStage::AudioExtraction);
                assert!(diagnostics.contains("Invalid data found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_child() {
        let started = Instant::now();
        let cmd = ToolCommand::new("sh").arg("-c").arg("sleep 30");
        let err = run_tool(&cmd, Duration::from_millis(200), PipelineStage::SubtitleBurn)
            .await
            .unwrap_err();

        assert!(matches!(err, TekstingError::ToolTimeout { stage: PipelineStage::SubtitleBurn, .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_background_descendant_cannot_outlive_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("survived");
        let script = format!("(sleep 3; touch '{}') & exit 0", marker.display());

        let started = Instant::now();
        let cmd = ToolCommand::new("sh").arg("-c").arg(script);
        let err = run_tool(&cmd, Duration::from_secs(1), PipelineStage::AudioExtraction)
            .await
            .unwrap_err();

        assert!(matches!(err, TekstingError::ToolTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));

        // the backgrounded subshell was killed with the group
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_captures_stdout() {
        let cmd = ToolCommand::new("sh").arg("-c").arg("printf hello");
        let out = run_tool(&cmd, Duration::from_secs(5), PipelineStage::Transcription)
            .await
            .unwrap();
        assert_eq!(out.stdout, "hello");
    }
}
