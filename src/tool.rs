//! Running external tools (ffmpeg, ffprobe, yt-dlp) under a time limit.

use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tracing::{debug, warn};

use crate::error::PipelineError;

/// Lines of stderr kept for error messages
const STDERR_TAIL_LINES: usize = 12;

/// Captured result of a successful tool run
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub stdout: Vec<u8>,
}

/// Why a tool run did not succeed
#[derive(Debug)]
pub(crate) enum ToolFailure {
    Spawn(std::io::Error),
    Timeout(Duration),
    Exit { status: ExitStatus, stderr: String },
}

impl ToolFailure {
    /// Map to a pipeline error. Timeouts and missing binaries keep their own
    /// variants, everything else goes through `domain` with a readable reason.
    pub fn into_error(
        self,
        tool: &str,
        domain: impl FnOnce(String) -> PipelineError,
    ) -> PipelineError {
        match self {
            Self::Timeout(timeout) => PipelineError::ToolTimeout {
                tool: tool.to_string(),
                timeout,
            },
            Self::Spawn(e) if e.kind() == std::io::ErrorKind::NotFound => {
                PipelineError::ToolMissing {
                    tool: tool.to_string(),
                }
            }
            Self::Spawn(e) => domain(format!("could not run {tool}: {e}")),
            Self::Exit { status, stderr } if stderr.is_empty() => {
                domain(format!("{tool} exited with {status}"))
            }
            Self::Exit { status, stderr } => {
                domain(format!("{tool} exited with {status}: {stderr}"))
            }
        }
    }
}

/// Resolve a tool name through `PATH`, falling back to the bare name so the
/// spawn error names the missing binary.
pub(crate) fn resolve(name: &str) -> String {
    which::which(name).map_or_else(|_| name.to_string(), |p| p.to_string_lossy().to_string())
}

/// Run `program` with `args`, killing it if it outlives `limit`.
///
/// Arguments are passed directly to the process, never through a shell.
pub(crate) async fn run_tool(
    program: &str,
    args: &[String],
    limit: Duration,
) -> Result<ToolOutput, ToolFailure> {
    debug!("{} args: {:?}", program, args);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(ToolFailure::Spawn)?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| ToolFailure::Spawn(std::io::Error::other("stdout not captured")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ToolFailure::Spawn(std::io::Error::other("stderr not captured")))?;

    let mut stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).await.map(|_| buf)
    });
    let mut stderr_task = tokio::spawn(drain_stderr(stderr, program.to_string()));

    // The limit covers draining the pipes too: a grandchild holding stdout
    // open keeps the run alive after the direct child exits.
    let collected = tokio::time::timeout(limit, async {
        let status = child.wait().await;
        let stdout = (&mut stdout_task).await;
        let stderr = (&mut stderr_task).await;
        (status, stdout, stderr)
    })
    .await;

    let Ok((status, stdout, stderr)) = collected else {
        let _ = child.kill().await;
        stdout_task.abort();
        stderr_task.abort();
        return Err(ToolFailure::Timeout(limit));
    };

    let status = status.map_err(ToolFailure::Spawn)?;
    let stdout = stdout
        .map_err(|e| ToolFailure::Spawn(std::io::Error::other(e)))?
        .map_err(ToolFailure::Spawn)?;
    let stderr = stderr.unwrap_or_default();

    if !status.success() {
        return Err(ToolFailure::Exit { status, stderr });
    }

    Ok(ToolOutput { stdout })
}

/// Log stderr as it arrives and keep the last few lines.
async fn drain_stderr(stderr: ChildStderr, program: String) -> String {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end().to_string();
        if line.is_empty() {
            continue;
        }
        if line.contains("ERROR") || line.contains("Error") || line.contains("WARNING") {
            warn!("{}: {}", program, line);
        } else {
            debug!("{}: {}", program, line);
        }
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    tail.into_iter().collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn mux_error(reason: String) -> PipelineError {
        PipelineError::MuxFailed {
            output: PathBuf::from("out.mp4"),
            reason,
        }
    }

    #[test]
    fn test_timeout_keeps_its_variant() {
        let err = ToolFailure::Timeout(Duration::from_secs(5)).into_error("ffmpeg", mux_error);
        assert!(matches!(err, PipelineError::ToolTimeout { .. }));
    }

    #[test]
    fn test_missing_binary_maps_to_tool_missing() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ToolFailure::Spawn(io).into_error("ffmpeg", mux_error);
        assert!(matches!(err, PipelineError::ToolMissing { ref tool } if tool == "ffmpeg"));
    }

    #[test]
    fn test_spawn_failure_maps_to_domain_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ToolFailure::Spawn(io).into_error("ffmpeg", mux_error);
        match err {
            PipelineError::MuxFailed { reason, .. } => assert!(reason.contains("could not run ffmpeg")),
            other => panic!("unexpected {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_failure() {
        let result = run_tool(
            "capburn-definitely-not-a-real-tool",
            &[],
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(ToolFailure::Spawn(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout_and_exit_status() {
        let ok = run_tool("sh", &["-c".into(), "printf hello".into()], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(ok.stdout, b"hello");

        let failed = run_tool(
            "sh",
            &["-c".into(), "echo broken >&2; exit 3".into()],
            Duration::from_secs(5),
        )
        .await;
        match failed {
            Err(ToolFailure::Exit { status, stderr }) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_tool_times_out() {
        let result = run_tool(
            "sh",
            &["-c".into(), "sleep 5".into()],
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(result, Err(ToolFailure::Timeout(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_inherited_stdout_does_not_outlive_limit() {
        let started = std::time::Instant::now();
        let result = run_tool(
            "sh",
            &["-c".into(), "sleep 5 & echo started".into()],
            Duration::from_millis(200),
        )
        .await;
        assert!(matches!(result, Err(ToolFailure::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
