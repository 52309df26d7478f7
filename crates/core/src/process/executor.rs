//! Shared types for running external tools.

use std::time::Duration;

/// Default cap on combined stdout + stderr capture (10 MiB).
pub const DEFAULT_MAX_CAPTURE_BYTES: usize = 10 * 1024 * 1024;

/// Default wall-clock limit for the reconstruction run (5 minutes).
pub const DEFAULT_PIPELINE_TIMEOUT: Duration = Duration::from_secs(300);

/// A program plus any leading arguments, e.g. `meshroom_compute` or
/// `bash /opt/tools/wrapper.sh`. Call-specific arguments are appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Parse a whitespace-separated command line. Returns `None` when empty.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

/// Resource bounds applied to one subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessLimits {
    /// Kill the process after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Maximum combined bytes read from stdout and stderr.
    pub max_capture_bytes: usize,
}

impl Default for ProcessLimits {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_PIPELINE_TIMEOUT),
            max_capture_bytes: DEFAULT_MAX_CAPTURE_BYTES,
        }
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Diagnostic text for a failed run: stderr, or stdout when stderr is empty.
    ///
    /// Returned verbatim. The tools' output is not a stable contract.
    pub fn diagnostics(&self) -> String {
        if self.stderr.trim().is_empty() {
            self.stdout.clone()
        } else {
            self.stderr.clone()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("process output exceeded the {limit_bytes}-byte capture limit")]
    CaptureOverflow { limit_bytes: usize },

    #[error("process failed with exit code {exit_code}: {diagnostics}")]
    ExecutionFailed { exit_code: i32, diagnostics: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
