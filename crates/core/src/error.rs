use crate::graph::GraphError;
use crate::process::executor::ProcessError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Filesystem error: {context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Pipeline(#[from] ProcessError),

    #[error("No output: {0}")]
    NoOutput(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn filesystem(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Filesystem {
            context: context.into(),
            source,
        }
    }
}
