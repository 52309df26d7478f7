use std::path::PathBuf;
use std::time::Duration;

use photomesh_core::process::executor::{
    ProcessLimits, ToolCommand, DEFAULT_MAX_CAPTURE_BYTES, DEFAULT_PIPELINE_TIMEOUT,
};
use photomesh_core::process::meshroom::DEFAULT_MESHROOM_COMMAND;
use photomesh_core::process::obj2gltf::DEFAULT_OBJ2GLTF_COMMAND;
use photomesh_core::workspace::CleanupPolicy;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `600`). Must outlast the
    /// reconstruction timeout plus conversion.
    pub request_timeout_secs: u64,
    /// Largest accepted request body in bytes (default: 512 MiB).
    pub max_upload_bytes: usize,
    /// External tool and workspace settings.
    pub photogrammetry: PhotogrammetryConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS` | `600`                      |
    /// | `MAX_UPLOAD_BYTES`     | `536870912`                |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| (512 * 1024 * 1024).to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let photogrammetry = PhotogrammetryConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_upload_bytes,
            photogrammetry,
        }
    }
}

/// Reconstruction pipeline settings.
#[derive(Debug, Clone)]
pub struct PhotogrammetryConfig {
    /// Directory under which session workspaces are created.
    pub workspace_root: PathBuf,
    /// Reconstruction tool command line.
    pub meshroom: ToolCommand,
    /// OBJ to GLB converter command line.
    pub obj2gltf: ToolCommand,
    /// Hard limit on the reconstruction run.
    pub pipeline_timeout: Duration,
    /// Combined stdout/stderr capture limit per subprocess.
    pub max_capture_bytes: usize,
    /// What to do with a workspace after the response is assembled.
    pub cleanup: CleanupPolicy,
}

impl PhotogrammetryConfig {
    /// Load from environment variables with defaults.
    ///
    /// | Env Var                 | Default              |
    /// |-------------------------|----------------------|
    /// | `WORKSPACE_ROOT`        | `<cwd>/temp`         |
    /// | `MESHROOM_COMMAND`      | `meshroom_compute`   |
    /// | `OBJ2GLTF_COMMAND`      | `obj2gltf`           |
    /// | `PIPELINE_TIMEOUT_SECS` | `300`                |
    /// | `MAX_CAPTURE_BYTES`     | `10485760`           |
    /// | `WORKSPACE_CLEANUP`     | `retain`             |
    pub fn from_env() -> Self {
        let workspace_root = std::env::var("WORKSPACE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::current_dir()
                    .expect("current directory must be accessible")
                    .join("temp")
            });

        let meshroom = tool_command_from_env("MESHROOM_COMMAND", DEFAULT_MESHROOM_COMMAND);
        let obj2gltf = tool_command_from_env("OBJ2GLTF_COMMAND", DEFAULT_OBJ2GLTF_COMMAND);

        let pipeline_timeout = std::env::var("PIPELINE_TIMEOUT_SECS")
            .map(|v| {
                Duration::from_secs(
                    v.parse()
                        .expect("PIPELINE_TIMEOUT_SECS must be a valid u64"),
                )
            })
            .unwrap_or(DEFAULT_PIPELINE_TIMEOUT);

        let max_capture_bytes: usize = std::env::var("MAX_CAPTURE_BYTES")
            .map(|v| v.parse().expect("MAX_CAPTURE_BYTES must be a valid usize"))
            .unwrap_or(DEFAULT_MAX_CAPTURE_BYTES);

        let cleanup = std::env::var("WORKSPACE_CLEANUP")
            .map(|v| {
                CleanupPolicy::from_name(&v)
                    .unwrap_or_else(|e| panic!("WORKSPACE_CLEANUP is invalid: {e}"))
            })
            .unwrap_or_default();

        Self {
            workspace_root,
            meshroom,
            obj2gltf,
            pipeline_timeout,
            max_capture_bytes,
            cleanup,
        }
    }

    /// Limits for the reconstruction run.
    pub fn pipeline_limits(&self) -> ProcessLimits {
        ProcessLimits {
            timeout: Some(self.pipeline_timeout),
            max_capture_bytes: self.max_capture_bytes,
        }
    }
}

fn tool_command_from_env(var: &str, default: &str) -> ToolCommand {
    std::env::var(var)
        .ok()
        .and_then(|v| ToolCommand::parse(&v))
        .unwrap_or_else(|| ToolCommand::new(default))
}
