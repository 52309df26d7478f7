use std::sync::Arc;

use crate::config::ServerConfig;
use crate::reconstruction::orchestrator::ReconstructionOrchestrator;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Reconstruction pipeline service.
    pub orchestrator: Arc<ReconstructionOrchestrator>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let orchestrator = ReconstructionOrchestrator::new(&config.photogrammetry);
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }
}
