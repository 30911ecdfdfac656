//! Error types for pipeline construction and execution.

use thiserror::Error;

/// Convenience result type using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type for all pipeline engine operations.
///
/// Node failures reported through [`crate::NodeResult`] with
/// `success == false` are *not* errors at this level; they abort the
/// pipeline but produce a failed [`crate::WorkflowResult`]. `GraphError` is
/// reserved for conditions the engine itself cannot express as a result:
/// malformed plans, unknown node names, and invalid file-change values.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Plan or state validation failed.
    #[error("Pipeline validation failed: {0}")]
    Validation(String),

    /// A plan referenced a node name with no registered instance.
    ///
    /// This is a programmer error in graph construction, not a runtime
    /// condition.
    #[error("Unknown node: '{0}'")]
    UnknownNode(String),

    /// A node's execution returned an error (as opposed to a failed result).
    #[error("Node '{node}' execution failed: {error}")]
    NodeExecution {
        /// Name of the node that failed
        node: String,
        /// Error message from node execution
        error: String,
    },

    /// A file-change value violated its construction invariants.
    #[error("Invalid file change: {0}")]
    InvalidChange(String),

    /// General execution error without node context.
    #[error("Execution failed: {0}")]
    Execution(String),
}

impl GraphError {
    /// Create a [`GraphError::NodeExecution`] with context.
    pub fn node_execution(node: impl Into<String>, error: impl Into<String>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            error: error.into(),
        }
    }
}
