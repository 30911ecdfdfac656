//! Error types for the scribe service.

use thiserror::Error;

use crate::workflow::WorkflowStatus;

/// Result type alias for scribe operations.
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Main error type for scribe operations.
#[derive(Error, Debug)]
pub enum ScribeError {
    /// Caller supplied unusable input (empty prompts, bad pagination).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested workflow type has no registered graph.
    #[error("Unknown workflow type: '{requested}'. Available types: {available}")]
    UnknownWorkflowType {
        requested: String,
        available: String,
    },

    /// Workflow record does not exist.
    #[error("Workflow {0} not found")]
    NotFound(i64),

    /// Illegal lifecycle transition attempted on a record.
    #[error("Invalid transition: workflow {id} cannot {event} from {status}")]
    InvalidTransition {
        id: i64,
        status: WorkflowStatus,
        event: &'static str,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Task queue failure.
    #[error("Queue error: {0}")]
    Queue(String),

    /// The run exceeded its wall-clock budget.
    #[error("Workflow timed out after {0} seconds")]
    Timeout(u64),

    /// Pipeline engine error.
    #[error(transparent)]
    Graph(#[from] graph_core::GraphError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<sqlx::Error> for ScribeError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}
