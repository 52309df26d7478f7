//! OBJ to GLB conversion.
//!
//! Runs `<obj2gltf> -i <input> -o <output>`. The converter has no timeout of
//! its own; callers treat its failures as non-fatal.

use std::path::Path;

use super::executor::{ProcessError, ProcessLimits, ProcessOutput, ToolCommand};
use super::subprocess;

/// Default conversion command.
pub const DEFAULT_OBJ2GLTF_COMMAND: &str = "obj2gltf";

#[derive(Debug, Clone)]
pub struct GltfConverter {
    command: ToolCommand,
    limits: ProcessLimits,
}

impl GltfConverter {
    /// Build a converter bounded only by `max_capture_bytes`.
    pub fn new(command: ToolCommand, max_capture_bytes: usize) -> Self {
        Self {
            command,
            limits: ProcessLimits {
                timeout: None,
                max_capture_bytes,
            },
        }
    }

    pub async fn convert(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<ProcessOutput, ProcessError> {
        let mut cmd = self.command.to_command();
        cmd.arg("-i").arg(input).arg("-o").arg(output);

        let result = subprocess::run_command(&mut cmd, &self.limits).await?;
        if !result.success() {
            return Err(ProcessError::ExecutionFailed {
                exit_code: result.exit_code,
                diagnostics: result.diagnostics(),
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::process::test_helpers::bash_tool;

    #[tokio::test]
    async fn converts_into_requested_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = bash_tool(dir.path(), "obj2gltf.sh", "printf glTF > \"$4\"\n");
        let converter = GltfConverter::new(tool, 1024);
        let out = dir.path().join("model.glb");

        converter
            .convert(&dir.path().join("mesh.obj"), &out)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"glTF");
    }

    #[tokio::test]
    async fn converter_failure_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = bash_tool(dir.path(), "obj2gltf.sh", "echo 'bad obj' >&2\nexit 2\n");
        let converter = GltfConverter::new(tool, 1024);

        assert_matches!(
            converter.convert(Path::new("/in.obj"), Path::new("/out.glb")).await,
            Err(ProcessError::ExecutionFailed { exit_code: 2, .. })
        );
    }
}
