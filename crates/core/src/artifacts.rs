//! Output artifact collection.
//!
//! The reconstruction tool leaves its deliverables at fixed paths under the
//! session's output directory. The mesh is mandatory: a zero exit status
//! without it still counts as a failed reconstruction. Texture and GLB are
//! read only when present.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

use crate::error::CoreError;

/// Textured mesh, relative to the output directory.
pub const MESH_RELATIVE_PATH: &str = "Texturing/texturedMesh.obj";

/// Texture atlas, relative to the output directory.
pub const TEXTURE_RELATIVE_PATH: &str = "Texturing/texture_1001.jpg";

/// Converted binary glTF, relative to the output directory.
pub const GLB_RELATIVE_PATH: &str = "model.glb";

/// Error message for a run that exited cleanly but produced no mesh.
pub const NO_MESH_MESSAGE: &str = "No mesh generated - check photo quality and overlap";

pub fn mesh_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MESH_RELATIVE_PATH)
}

pub fn texture_path(output_dir: &Path) -> PathBuf {
    output_dir.join(TEXTURE_RELATIVE_PATH)
}

pub fn glb_path(output_dir: &Path) -> PathBuf {
    output_dir.join(GLB_RELATIVE_PATH)
}

/// Confirm the mesh exists and return its path, or fail with
/// [`CoreError::NoOutput`].
pub async fn ensure_mesh(output_dir: &Path) -> Result<PathBuf, CoreError> {
    let path = mesh_path(output_dir);
    let exists = tokio::fs::try_exists(&path).await.map_err(|e| {
        CoreError::filesystem(format!("failed to stat {}", path.display()), e)
    })?;
    if !exists {
        return Err(CoreError::NoOutput(NO_MESH_MESSAGE.to_string()));
    }
    Ok(path)
}

/// Remove whatever a failed conversion left at the GLB path.
///
/// Returns `true` if a file was removed. A missing file is not an error.
pub async fn discard_glb(output_dir: &Path) -> Result<bool, CoreError> {
    let path = glb_path(output_dir);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CoreError::filesystem(
            format!("failed to remove {}", path.display()),
            e,
        )),
    }
}

/// Raw artifact bytes read from an output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub mesh: Vec<u8>,
    pub texture: Option<Vec<u8>>,
    pub glb: Option<Vec<u8>>,
}

impl ArtifactSet {
    pub async fn collect(output_dir: &Path) -> Result<Self, CoreError> {
        let mesh = match read_optional(&mesh_path(output_dir)).await? {
            Some(bytes) => bytes,
            None => return Err(CoreError::NoOutput(NO_MESH_MESSAGE.to_string())),
        };

        Ok(Self {
            mesh,
            texture: read_optional(&texture_path(output_dir)).await?,
            glb: read_optional(&glb_path(output_dir)).await?,
        })
    }

    /// Base64-encode every artifact for a JSON payload.
    pub fn encode(&self) -> EncodedArtifacts {
        EncodedArtifacts {
            mesh: STANDARD.encode(&self.mesh),
            texture: self.texture.as_ref().map(|b| STANDARD.encode(b)),
            glb: self.glb.as_ref().map(|b| STANDARD.encode(b)),
        }
    }
}

/// Text-safe artifact set; absent optionals serialize as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedArtifacts {
    pub mesh: String,
    pub texture: Option<String>,
    pub glb: Option<String>,
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, CoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CoreError::filesystem(
            format!("failed to read {}", path.display()),
            e,
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
