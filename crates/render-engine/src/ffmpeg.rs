//! ffmpeg/ffprobe process plumbing.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use kenburns_common::error::{KenburnsError, KenburnsResult};
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::task::JoinHandle;

/// Number of stderr lines kept in error messages.
const STDERR_TAIL_LINES: usize = 8;

/// Whether `binary` starts and exits cleanly for `-version`. The name is
/// passed straight to exec, never through a shell.
pub fn tool_available(binary: &str) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run a tool to completion, capturing stdout and stderr.
///
/// The child is killed if the returned future is dropped, so racing this
/// against a timeout or a cancellation token never leaves a process behind.
pub(crate) async fn run_tool(binary: &str, args: &[String]) -> std::io::Result<Output> {
    tracing::debug!(binary, ?args, "Running external tool");
    tokio::process::Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
}

/// Start a long-running tool with piped stdout and stderr. Dropping the
/// child kills it.
pub(crate) fn spawn_tool(binary: &str, args: &[String]) -> std::io::Result<Child> {
    tracing::debug!(binary, ?args, "Starting external tool");
    tokio::process::Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

/// Collect a spawned child's stderr on its own task so the tool never
/// blocks on a full pipe. Resolves to the last few lines once stderr closes.
pub(crate) fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut raw = Vec::new();
        match stderr.read_to_end(&mut raw).await {
            Ok(_) => tail_lines(&String::from_utf8_lossy(&raw)),
            Err(e) => format!("<failed to read stderr: {e}>"),
        }
    }))
}

/// Last few lines of a tool's stderr, for error messages.
pub(crate) fn stderr_tail(output: &Output) -> String {
    tail_lines(&String::from_utf8_lossy(&output.stderr))
}

fn tail_lines(text: &str) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Map a finished encode run to a result.
pub(crate) fn check_encode(binary: &str, output: std::io::Result<Output>) -> KenburnsResult<()> {
    let output = output
        .map_err(|e| KenburnsError::encode_service(format!("failed to start {binary}: {e}")))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(KenburnsError::encode_service(format!(
            "{binary} exited with {}: {}",
            output.status,
            stderr_tail(&output)
        )))
    }
}

/// Unique scratch path in the system temp directory.
pub(crate) fn scratch_path(prefix: &str, extension: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%3f");
    std::env::temp_dir().join(format!(
        "kenburns-{prefix}-{}-{stamp}-{n}.{extension}",
        std::process::id()
    ))
}

/// Best-effort removal of a scratch file.
pub(crate) fn remove_scratch(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
        }
    }
}
