//! Handler for the photogrammetry upload endpoint.
//!
//! Accepts a multipart form with repeated `photos` fields, runs the
//! reconstruction, and returns the artifacts base64-encoded in one JSON body.

use axum::extract::{Multipart, State};
use axum::Json;
use photomesh_core::artifacts::EncodedArtifacts;
use photomesh_core::types::SessionId;
use photomesh_core::workspace::validate_photo_count;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field carrying the photos.
pub const PHOTOS_FIELD: &str = "photos";

/// Placeholder reported for `stats.meshVertices`.
pub const MESH_VERTICES_PLACEHOLDER: &str = "unknown";

/// Placeholder reported for `stats.processingTime`.
pub const PROCESSING_TIME_PLACEHOLDER: &str = "calculated";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionResponse {
    pub success: bool,
    pub session_id: SessionId,
    pub files: EncodedArtifacts,
    pub stats: ReconstructionStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionStats {
    pub photos_processed: usize,
    pub mesh_vertices: &'static str,
    pub processing_time: &'static str,
}

/// POST /api/photogrammetry
///
/// Fewer than three photos is a 400 and never creates a workspace. Tool
/// failures and missing meshes are 500s; a failed GLB conversion only leaves
/// `files.glb` null.
pub async fn reconstruct(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ReconstructionResponse>> {
    let mut photos = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(PHOTOS_FIELD) {
            continue; // ignore unknown fields
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        photos.push(data);
    }

    validate_photo_count(photos.len())?;

    let result = state.orchestrator.reconstruct(photos.as_slice()).await?;

    Ok(Json(ReconstructionResponse {
        success: true,
        session_id: result.session_id,
        files: result.artifacts.encode(),
        stats: ReconstructionStats {
            photos_processed: result.photos_processed,
            mesh_vertices: MESH_VERTICES_PLACEHOLDER,
            processing_time: PROCESSING_TIME_PLACEHOLDER,
        },
    }))
}
