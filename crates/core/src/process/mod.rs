//! External tool invocation.
//!
//! [`subprocess::run_command`] owns spawn, capture and timeout handling; the
//! tool wrappers ([`meshroom::MeshroomRunner`], [`obj2gltf::GltfConverter`])
//! only build the command line and interpret the exit status.

pub mod executor;
pub mod meshroom;
pub mod obj2gltf;
pub mod subprocess;

/// Shared test helpers for tool tests.
#[cfg(test)]
pub(crate) mod test_helpers {
    use std::path::{Path, PathBuf};

    use super::executor::ToolCommand;

    /// Write a bash script into `dir` and return a [`ToolCommand`] running it
    /// through `bash`, so the file itself never needs to be executable.
    pub fn bash_tool(dir: &Path, name: &str, body: &str) -> ToolCommand {
        let path: PathBuf = dir.join(name);
        std::fs::write(&path, format!("#!/bin/bash\n{body}")).expect("write script");
        ToolCommand::new("bash").with_arg(path.to_string_lossy())
    }
}
