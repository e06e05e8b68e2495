//! Error types for SiteIQ Core
//!
//! Two families live here: [`SiteIqError`] for everything the orchestrator
//! itself can fail with, and [`CollaboratorError`] for what an external
//! collaborator reports back across its trait boundary.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::query::QueryState;

/// Result type alias for SiteIQ operations
pub type Result<T> = std::result::Result<T, SiteIqError>;

/// Main error type for SiteIQ operations
#[derive(Error, Debug)]
pub enum SiteIqError {
    /// The query is missing required fields or names unknown layers
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// No admission permit became free before the query deadline
    #[error("Admission timed out after {0:?}")]
    AdmissionTimeout(Duration),

    /// Both mandatory collaborators (semantic and context) failed
    #[error("Critical layers failed: semantic: {semantic}; context: {context}")]
    CriticalLayerFailure {
        /// Semantic collaborator failure
        semantic: String,
        /// Context collaborator failure
        context: String,
    },

    /// The query deadline elapsed while waiting on a collaborator
    #[error("Query {query_id} exceeded its {budget:?} response budget")]
    Timeout {
        /// Query that ran out of time
        query_id: Uuid,
        /// The configured `max_response_time`
        budget: Duration,
    },

    /// Caller-initiated cancellation
    #[error("Query {0} was cancelled")]
    Cancelled(Uuid),

    /// Illegal lifecycle transition
    #[error("Invalid query state transition from {from} to {to}")]
    InvalidTransition {
        /// State the query was in
        from: QueryState,
        /// State that was requested
        to: QueryState,
    },

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything unexpected inside the orchestrator
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SiteIqError {
    /// Short, stable label used in logs and events
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => "invalid_query",
            Self::AdmissionTimeout(_) => "admission_timeout",
            Self::CriticalLayerFailure { .. } => "critical_layer_failure",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled(_) => "cancelled",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Serialization(_) => "serialization",
            Self::Toml(_) => "toml",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }
}

/// Errors reported by collaborator implementations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Collaborator call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Collaborator internal error: {0}")]
    Internal(String),
}
