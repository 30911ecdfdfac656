//! Node capability contract.
//!
//! A node is one stage of a pipeline. It validates a view of the pipeline
//! state, performs its work (usually against an external client), and
//! returns a structured [`NodeResult`]. Implementations live in the service
//! crate; the engine only depends on this trait.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::change::FileChange;
use crate::error::Result;
use crate::state::PipelineState;

/// Structured result returned by a node's execution.
///
/// A result with `success == false` aborts the pipeline; its message becomes
/// the workflow's error message. A node may succeed with zero changes and
/// still deposit metadata for downstream nodes.
#[derive(Debug, Clone)]
pub struct NodeResult {
    /// Whether the node completed its work.
    pub success: bool,
    /// File changes to append to the accumulated set.
    pub changes: Vec<FileChange>,
    /// Human-readable outcome message.
    pub message: String,
    /// Open key/value pairs merged into pipeline state for downstream nodes.
    pub metadata: HashMap<String, Value>,
}

impl NodeResult {
    /// Successful result with a message and no changes.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            changes: Vec::new(),
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    /// Failed result with a message. Aborts the pipeline when returned.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            changes: Vec::new(),
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach file changes to the result.
    pub fn with_changes(mut self, changes: Vec<FileChange>) -> Self {
        self.changes = changes;
        self
    }

    /// Attach one metadata entry to the result.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Capability contract for a pipeline stage.
///
/// `validate` must be pure: it inspects state and reports whether the node
/// is prepared to execute. `execute` may perform I/O and suspend at external
/// client boundaries. The executor retries neither; a returned error or a
/// failed result aborts the run.
#[async_trait]
pub trait Node: Send + Sync {
    /// Stable name this node registers under in graph plans.
    fn name(&self) -> &str;

    /// Whether the node's preconditions hold for the given state.
    fn validate(&self, state: &PipelineState) -> bool;

    /// Perform the node's work against the given state.
    async fn execute(&self, state: &PipelineState) -> Result<NodeResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_builder() {
        let result = NodeResult::ok("generated topic")
            .with_metadata("topic_title", json!("Rust Memory Model"));

        assert!(result.success);
        assert!(result.changes.is_empty());
        assert_eq!(result.metadata["topic_title"], json!("Rust Memory Model"));
    }

    #[test]
    fn test_failure_builder() {
        let result = NodeResult::failure("research service unavailable");
        assert!(!result.success);
        assert_eq!(result.message, "research service unavailable");
    }
}
