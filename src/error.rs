//! Error types for reporting a run.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::capture::CaptureError;
use crate::core::validator::ConfigError;

/// Errors that stop a run from being reported
#[derive(Debug, Error)]
pub enum ReportError {
    /// Bad configuration; the run never starts
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An edge points at an entity that is not in the graph
    #[error("Entity '{entity}' references missing entity '{target}' via '{property}'")]
    ReferentialIntegrity {
        entity: String,
        property: String,
        target: String,
    },

    /// Two nodes of the document share an identifier
    #[error("Entity identifier '{id}' is not unique")]
    DuplicateEntity { id: String },

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write status document: {0}")]
    Status(#[source] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run was already completed")]
    AlreadyCompleted,
}

impl ReportError {
    /// Whether this error was raised before any task ran
    pub fn is_configuration(&self) -> bool {
        matches!(self, ReportError::Config(_))
    }
}
