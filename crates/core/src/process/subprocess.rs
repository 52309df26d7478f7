//! Subprocess execution with bounded capture and an optional timeout.
//!
//! Both tool wrappers delegate here after building their
//! [`tokio::process::Command`].

use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::executor::{ProcessError, ProcessLimits, ProcessOutput};

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Spawn `cmd`, capture stdout/stderr and wait for it to exit.
///
/// The two streams share one capture budget of `limits.max_capture_bytes`.
/// Crossing it, or exceeding `limits.timeout`, kills the child and returns
/// [`ProcessError::CaptureOverflow`] or [`ProcessError::Timeout`]. A non-zero
/// exit status is *not* an error here; callers decide what it means.
pub async fn run_command(
    cmd: &mut Command,
    limits: &ProcessLimits,
) -> Result<ProcessOutput, ProcessError> {
    // `kill_on_drop(true)` also covers the request future being dropped.
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let start = Instant::now();

    let mut child = cmd
        .spawn()
        .map_err(|source| ProcessError::Spawn { program, source })?;

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let captured = AtomicUsize::new(0);
    let limit = limits.max_capture_bytes;

    let run = async {
        let (stdout, stderr) = tokio::try_join!(
            read_stream(stdout_handle, &captured, limit),
            read_stream(stderr_handle, &captured, limit),
        )?;
        let status = child.wait().await?;
        Ok::<_, ProcessError>((status, stdout, stderr))
    };

    let result = match limits.timeout {
        Some(timeout) => match tokio::time::timeout(timeout, run).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ProcessError::Timeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
            }),
        },
        None => run.await,
    };

    match result {
        Ok((status, stdout, stderr)) => Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code().unwrap_or(-1),
            duration_ms: start.elapsed().as_millis() as u64,
        }),
        Err(err) => {
            // Best-effort; the child may already be gone.
            let _ = child.start_kill();
            Err(err)
        }
    }
}

/// Read a stream to EOF, charging every chunk against the shared budget.
async fn read_stream<R: AsyncRead + Unpin>(
    handle: Option<R>,
    captured: &AtomicUsize,
    limit: usize,
) -> Result<Vec<u8>, ProcessError> {
    let mut buf = Vec::new();
    let Some(mut reader) = handle else {
        return Ok(buf);
    };

    let mut chunk = [0u8; READ_CHUNK_BYTES];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let total = captured.fetch_add(n, Ordering::Relaxed) + n;
        if total > limit {
            return Err(ProcessError::CaptureOverflow { limit_bytes: limit });
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::process::test_helpers::bash_tool;

    fn limits(timeout_ms: Option<u64>, max_capture_bytes: usize) -> ProcessLimits {
        ProcessLimits {
            timeout: timeout_ms.map(Duration::from_millis),
            max_capture_bytes,
        }
    }

    #[tokio::test]
    async fn captures_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let tool = bash_tool(dir.path(), "t.sh", "echo hello\necho oops >&2\n");

        let output = run_command(&mut tool.to_command(), &limits(Some(5_000), 1024))
            .await
            .unwrap();

        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "oops\n");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let tool = bash_tool(dir.path(), "t.sh", "exit 42\n");

        let output = run_command(&mut tool.to_command(), &limits(Some(5_000), 1024))
            .await
            .unwrap();

        assert_eq!(output.exit_code, 42);
        assert!(!output.success());
    }

    #[tokio::test]
    async fn timeout_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let tool = bash_tool(dir.path(), "t.sh", "exec sleep 10\n");

        let start = Instant::now();
        let result = run_command(&mut tool.to_command(), &limits(Some(200), 1024)).await;

        assert_matches!(result, Err(ProcessError::Timeout { elapsed_ms }) => {
            assert!(elapsed_ms >= 200);
        });
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn combined_output_over_limit_overflows() {
        let dir = tempfile::tempdir().unwrap();
        let tool = bash_tool(
            dir.path(),
            "t.sh",
            "head -c 3000 /dev/zero\nhead -c 3000 /dev/zero >&2\n",
        );

        let result = run_command(&mut tool.to_command(), &limits(Some(5_000), 4096)).await;

        assert_matches!(
            result,
            Err(ProcessError::CaptureOverflow { limit_bytes: 4096 })
        );
    }

    #[tokio::test]
    async fn output_at_limit_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let tool = bash_tool(dir.path(), "t.sh", "head -c 4096 /dev/zero\n");

        let output = run_command(&mut tool.to_command(), &limits(None, 4096))
            .await
            .unwrap();

        assert_eq!(output.stdout.len(), 4096);
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let mut cmd = Command::new("/nonexistent/photomesh-tool");
        let result = run_command(&mut cmd, &limits(Some(1_000), 1024)).await;

        assert_matches!(result, Err(ProcessError::Spawn { program, .. }) => {
            assert_eq!(program, "/nonexistent/photomesh-tool");
        });
    }
}
