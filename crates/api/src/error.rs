use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use photomesh_core::error::CoreError;
use serde_json::json;

/// Message for any failure of the reconstruction run itself.
pub const PIPELINE_FAILED_MESSAGE: &str = "Photogrammetry processing failed";

/// Message for unanticipated failures.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce `{ "error", "code", "details"? }`
/// JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `photomesh_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
                }
                CoreError::Pipeline(err) => {
                    tracing::error!(error = %err, "Reconstruction pipeline failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "PIPELINE_ERROR",
                        PIPELINE_FAILED_MESSAGE.to_string(),
                        Some(err.to_string()),
                    )
                }
                CoreError::NoOutput(msg) => {
                    tracing::warn!(error = %msg, "Reconstruction produced no mesh");
                    (StatusCode::INTERNAL_SERVER_ERROR, "NO_OUTPUT", msg.clone(), None)
                }
                CoreError::Filesystem { .. } | CoreError::Graph(_) | CoreError::Internal(_) => {
                    tracing::error!(error = %core, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        INTERNAL_ERROR_MESSAGE.to_string(),
                        Some(core.to_string()),
                    )
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    Some(msg.clone()),
                )
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        (status, axum::Json(body)).into_response()
    }
}
