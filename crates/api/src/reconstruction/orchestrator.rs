//! Central reconstruction orchestrator service.
//!
//! Held in [`AppState`](crate::state::AppState) as an
//! `Arc<ReconstructionOrchestrator>`. One call to
//! [`ReconstructionOrchestrator::reconstruct`] handles one upload end to end.

use std::path::{Path, PathBuf};

use photomesh_core::artifacts::{self, ArtifactSet};
use photomesh_core::error::CoreError;
use photomesh_core::graph::PipelineGraph;
use photomesh_core::job::{JobState, JobTimeline};
use photomesh_core::process::meshroom::MeshroomRunner;
use photomesh_core::process::obj2gltf::GltfConverter;
use photomesh_core::types::SessionId;
use photomesh_core::workspace::{validate_photo_count, CleanupPolicy, SessionWorkspace};

use crate::config::PhotogrammetryConfig;
use crate::error::AppResult;

/// Outcome of a successful reconstruction.
#[derive(Debug)]
pub struct ReconstructionResult {
    pub session_id: SessionId,
    pub artifacts: ArtifactSet,
    pub photos_processed: usize,
    pub timeline: JobTimeline,
}

/// Runs the reconstruction flow for one photo set.
///
/// Steps, strictly in order:
/// 1. Validate the photo count (before touching the filesystem).
/// 2. Create the session workspace and persist the photos.
/// 3. Build and write the job graph.
/// 4. Run the reconstruction tool. Any failure here is fatal.
/// 5. Check for the mesh. A clean exit without it is still fatal.
/// 6. Attempt GLB conversion. Failure is logged and tolerated.
/// 7. Read the artifacts and apply the cleanup policy.
pub struct ReconstructionOrchestrator {
    workspace_root: PathBuf,
    meshroom: MeshroomRunner,
    converter: GltfConverter,
    cleanup: CleanupPolicy,
}

impl ReconstructionOrchestrator {
    pub fn new(config: &PhotogrammetryConfig) -> Self {
        Self {
            workspace_root: config.workspace_root.clone(),
            meshroom: MeshroomRunner::new(config.meshroom.clone(), config.pipeline_limits()),
            converter: GltfConverter::new(config.obj2gltf.clone(), config.max_capture_bytes),
            cleanup: config.cleanup,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub async fn reconstruct<B: AsRef<[u8]>>(
        &self,
        photos: &[B],
    ) -> AppResult<ReconstructionResult> {
        validate_photo_count(photos.len())?;
        tracing::info!(photo_count = photos.len(), "Starting photogrammetry");

        let mut timeline = JobTimeline::new();
        let workspace = SessionWorkspace::create(&self.workspace_root).await?;
        let session_id = workspace.id();
        advance(&mut timeline, session_id, JobState::WorkspaceReady)?;

        let result = self.run_session(&workspace, photos, &mut timeline).await;

        match workspace.cleanup(self.cleanup).await {
            Ok(true) => tracing::debug!(%session_id, "Workspace removed"),
            Ok(false) => {}
            Err(e) => tracing::warn!(%session_id, error = %e, "Workspace cleanup failed"),
        }

        let artifacts = result?;
        tracing::info!(%session_id, "Photogrammetry completed successfully");

        Ok(ReconstructionResult {
            session_id,
            artifacts,
            photos_processed: photos.len(),
            timeline,
        })
    }

    async fn run_session<B: AsRef<[u8]>>(
        &self,
        workspace: &SessionWorkspace,
        photos: &[B],
        timeline: &mut JobTimeline,
    ) -> AppResult<ArtifactSet> {
        let session_id = workspace.id();
        let output_dir = workspace.output_dir();

        let photo_paths = workspace.persist_photos(photos).await?;
        advance(timeline, session_id, JobState::PhotosPersisted)?;
        tracing::info!(
            %session_id,
            photos_dir = %workspace.photos_dir().display(),
            "Photos saved"
        );

        let graph = PipelineGraph::photogrammetry(&photo_paths).map_err(CoreError::from)?;
        let config_path = workspace.config_path();
        graph.write_to(&config_path).await?;
        advance(timeline, session_id, JobState::GraphBuilt)?;

        advance(timeline, session_id, JobState::PrimaryRunning)?;
        tracing::info!(
            %session_id,
            timeout_secs = self.meshroom.limits().timeout.map(|t| t.as_secs()),
            "Starting reconstruction tool"
        );
        match self.meshroom.run(&config_path, &output_dir).await {
            Ok(output) => {
                tracing::debug!(%session_id, stdout = %output.stdout, "Reconstruction stdout");
                if !output.stderr.is_empty() {
                    tracing::debug!(%session_id, stderr = %output.stderr, "Reconstruction stderr");
                }
                tracing::info!(
                    %session_id,
                    exit_code = output.exit_code,
                    duration_ms = output.duration_ms,
                    "Reconstruction tool finished"
                );
                advance(timeline, session_id, JobState::PrimarySucceeded)?;
            }
            Err(err) => {
                advance(timeline, session_id, JobState::PrimaryFailed)?;
                return Err(CoreError::Pipeline(err).into());
            }
        }

        let checked = artifacts::ensure_mesh(&output_dir).await;
        advance(timeline, session_id, JobState::OutputChecked)?;
        let mesh_path = match checked {
            Ok(path) => {
                advance(timeline, session_id, JobState::OutputFound)?;
                path
            }
            Err(err) => {
                if matches!(err, CoreError::NoOutput(_)) {
                    advance(timeline, session_id, JobState::NoOutput)?;
                }
                return Err(err.into());
            }
        };

        let glb_path = artifacts::glb_path(&output_dir);
        let converted = self.converter.convert(&mesh_path, &glb_path).await;
        if let Err(err) = &converted {
            tracing::warn!(%session_id, error = %err, "GLB conversion failed, returning OBJ only");
            // A partial file from the failed run must not be returned.
            if let Err(e) = artifacts::discard_glb(&output_dir).await {
                tracing::warn!(%session_id, error = %e, "Failed to remove partial GLB");
            }
        }
        advance(timeline, session_id, JobState::ConversionAttempted)?;

        let mut artifacts = ArtifactSet::collect(&output_dir).await?;
        if converted.is_err() {
            artifacts.glb = None;
        }
        advance(timeline, session_id, JobState::ResponseAssembled)?;

        Ok(artifacts)
    }
}

fn advance(timeline: &mut JobTimeline, session_id: SessionId, next: JobState) -> AppResult<()> {
    timeline.advance(next)?;
    tracing::debug!(%session_id, state = %next, "Job state changed");
    Ok(())
}
