//! Reconstruction tool runner.
//!
//! Runs `<meshroom> <config> --output <output_dir>` under the configured
//! limits. Any non-zero exit becomes [`ProcessError::ExecutionFailed`].

use std::path::Path;

use super::executor::{ProcessError, ProcessLimits, ProcessOutput, ToolCommand};
use super::subprocess;

/// Default reconstruction command.
pub const DEFAULT_MESHROOM_COMMAND: &str = "meshroom_compute";

#[derive(Debug, Clone)]
pub struct MeshroomRunner {
    command: ToolCommand,
    limits: ProcessLimits,
}

impl MeshroomRunner {
    pub fn new(command: ToolCommand, limits: ProcessLimits) -> Self {
        Self { command, limits }
    }

    pub fn limits(&self) -> &ProcessLimits {
        &self.limits
    }

    /// Run the pipeline described by `config_path`, writing into `output_dir`.
    pub async fn run(
        &self,
        config_path: &Path,
        output_dir: &Path,
    ) -> Result<ProcessOutput, ProcessError> {
        let mut cmd = self.command.to_command();
        cmd.arg(config_path).arg("--output").arg(output_dir);

        let output = subprocess::run_command(&mut cmd, &self.limits).await?;
        if !output.success() {
            return Err(ProcessError::ExecutionFailed {
                exit_code: output.exit_code,
                diagnostics: output.diagnostics(),
            });
        }
        Ok(output)
    }
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

    fn limits() -> ProcessLimits {
        ProcessLimits {
            timeout: Some(Duration::from_secs(5)),
            ..ProcessLimits::default()
        }
    }

    #[tokio::test]
    async fn passes_config_and_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tool = bash_tool(dir.path(), "meshroom.sh", "echo \"$1|$2|$3\"\n");
        let runner = MeshroomRunner::new(tool, limits());

        let output = runner
            .run(Path::new("/w/pipeline.mg"), Path::new("/w/output"))
            .await
            .unwrap();

        assert_eq!(output.stdout.trim(), "/w/pipeline.mg|--output|/w/output");
    }

    #[tokio::test]
    async fn failure_carries_stderr_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let tool = bash_tool(
            dir.path(),
            "meshroom.sh",
            "echo 'ERROR: SfM failed' >&2\nexit 1\n",
        );
        let runner = MeshroomRunner::new(tool, limits());

        let result = runner.run(Path::new("/c"), Path::new("/o")).await;

        assert_matches!(
            result,
            Err(ProcessError::ExecutionFailed { exit_code: 1, diagnostics }) => {
                assert_eq!(diagnostics, "ERROR: SfM failed\n");
            }
        );
    }

    #[tokio::test]
    async fn slow_run_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let tool = bash_tool(dir.path(), "meshroom.sh", "exec sleep 10\n");
        let runner = MeshroomRunner::new(
            tool,
            ProcessLimits {
                timeout: Some(Duration::from_millis(150)),
                ..ProcessLimits::default()
            },
        );

        assert_matches!(
            runner.run(Path::new("/c"), Path::new("/o")).await,
            Err(ProcessError::Timeout { .. })
        );
    }
}
