use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("failed to load artifact {}: {reason}", path.display())]
    ArtifactLoad { path: PathBuf, reason: String },

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("result structure mismatch for competitor {competitor}: {detail}")]
    StructureMismatch { competitor: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("plot rendering failed: {0}")]
    Plot(String),
}

impl EvalError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        EvalError::Precondition(msg.into())
    }

    pub fn artifact(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        EvalError::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors that only invalidate a single run and must not abort the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EvalError::ArtifactLoad { .. })
    }
}
