//! Per-request session workspaces.
//!
//! Every request gets its own directory tree under a configurable root:
//!
//! ```text
//! <root>/<session_id>/photos/photo_000.jpg ...
//! <root>/<session_id>/pipeline.mg
//! <root>/<session_id>/output/...
//! ```
//!
//! Uniqueness comes from the UUID v4 session id, so concurrent requests never
//! share a workspace and no locking is needed.

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::types::SessionId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fewest photos the reconstruction tool can work with.
pub const MIN_PHOTOS: usize = 3;

/// Subdirectory holding the persisted uploads.
pub const PHOTOS_DIR: &str = "photos";

/// Subdirectory the reconstruction tool writes into.
pub const OUTPUT_DIR: &str = "output";

/// File name of the serialized job graph.
pub const PIPELINE_CONFIG_FILE: &str = "pipeline.mg";

/// File name for the photo at `index` in upload order.
///
/// Zero-padded to three digits so lexical order matches upload order for the
/// common case; larger indices simply widen.
pub fn photo_file_name(index: usize) -> String {
    format!("photo_{index:03}.jpg")
}

/// Reject photo sets too small for reconstruction.
pub fn validate_photo_count(count: usize) -> Result<(), CoreError> {
    if count < MIN_PHOTOS {
        return Err(CoreError::Validation(format!(
            "At least {MIN_PHOTOS} photos required for photogrammetry"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Cleanup policy
// ---------------------------------------------------------------------------

/// What happens to a session's workspace once the response is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Leave the workspace on disk for an operator to inspect or prune.
    #[default]
    Retain,
    /// Delete the whole session tree.
    Remove,
}

impl CleanupPolicy {
    /// Parse from the `WORKSPACE_CLEANUP` configuration value.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(Self::Retain),
            "remove" => Ok(Self::Remove),
            other => Err(CoreError::Validation(format!(
                "Unknown cleanup policy '{other}'. Must be one of: retain, remove"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retain => "retain",
            Self::Remove => "remove",
        }
    }
}

// ---------------------------------------------------------------------------
// Session workspace
// ---------------------------------------------------------------------------

/// An isolated on-disk working area for one request.
#[derive(Debug, Clone)]
pub struct SessionWorkspace {
    id: SessionId,
    root: PathBuf,
}

impl SessionWorkspace {
    /// Allocate a fresh session id and create its `photos/` and `output/`
    /// directories (with any missing parents) under `base`.
    pub async fn create(base: &Path) -> Result<Self, CoreError> {
        let id = uuid::Uuid::new_v4();
        let workspace = Self {
            id,
            root: base.join(id.to_string()),
        };

        for dir in [workspace.photos_dir(), workspace.output_dir()] {
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                CoreError::filesystem(format!("failed to create {}", dir.display()), e)
            })?;
        }

        Ok(workspace)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The session directory, `<base>/<session_id>`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.root.join(PHOTOS_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(PIPELINE_CONFIG_FILE)
    }

    /// Write each photo under its sequential name, preserving upload order.
    ///
    /// Returns the written paths in the same order.
    pub async fn persist_photos<B: AsRef<[u8]>>(
        &self,
        photos: &[B],
    ) -> Result<Vec<PathBuf>, CoreError> {
        let photos_dir = self.photos_dir();
        let mut paths = Vec::with_capacity(photos.len());

        for (index, photo) in photos.iter().enumerate() {
            let path = photos_dir.join(photo_file_name(index));
            tokio::fs::write(&path, photo.as_ref()).await.map_err(|e| {
                CoreError::filesystem(format!("failed to write {}", path.display()), e)
            })?;
            paths.push(path);
        }

        Ok(paths)
    }

    /// Apply `policy` to this workspace. Returns `true` if the tree was removed.
    pub async fn cleanup(&self, policy: CleanupPolicy) -> Result<bool, CoreError> {
        match policy {
            CleanupPolicy::Retain => Ok(false),
            CleanupPolicy::Remove => {
                tokio::fs::remove_dir_all(&self.root).await.map_err(|e| {
                    CoreError::filesystem(
                        format!("failed to remove {}", self.root.display()),
                        e,
                    )
                })?;
                Ok(true)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
