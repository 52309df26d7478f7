//! Route tables.

pub mod health;

use axum::routing::post;
use axum::Router;

use crate::handlers::photogrammetry;
use crate::state::AppState;

/// Routes mounted under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/photogrammetry", post(photogrammetry::reconstruct))
}
