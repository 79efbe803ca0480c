//! Error types for assay-engine

use thiserror::Error;

use crate::types::{AssessmentId, Attempt, AttemptId};

/// Error type for assessment operations
#[derive(Debug, Error)]
pub enum AssayError {
    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Caller does not own the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Operation not allowed in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Assessment is not published or outside its schedule window
    #[error("Assessment is not active: {0}")]
    NotActive(AssessmentId),

    /// An in-progress attempt already exists for this learner and assessment
    #[error("Attempt already in progress: {}", .0.id)]
    DuplicateAttempt(Box<Attempt>),

    /// Attempt was already finalized
    #[error("Attempt already submitted: {0}")]
    AlreadySubmitted(AttemptId),

    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catalog or generation collaborator unreachable
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Schema migration failed
    #[error("Schema migration failed: {0}")]
    Migration(String),

    /// Serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssayError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Boundary classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidState(_)
            | Self::NotActive(_)
            | Self::DuplicateAttempt(_)
            | Self::AlreadySubmitted(_) => ErrorKind::InvalidState,
            Self::Validation(_) => ErrorKind::Validation,
            Self::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            Self::Database(_) | Self::Migration(_) | Self::Serialization(_) | Self::Io(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<serde_json::Error> for AssayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Error classes exposed at the service boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidState,
    Validation,
    UpstreamUnavailable,
    Internal,
}

impl ErrorKind {
    /// HTTP status a transport layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Forbidden => 403,
            Self::InvalidState | Self::Validation => 400,
            Self::UpstreamUnavailable => 503,
            Self::Internal => 500,
        }
    }
}

/// Result type alias for assay operations
pub type Result<T> = std::result::Result<T, AssayError>;
