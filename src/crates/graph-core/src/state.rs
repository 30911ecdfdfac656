//! Pipeline state threaded through nodes during a run.
//!
//! The well-known slots (`vault_summary`, `strategy`, `prompts`, the change
//! and message logs) are explicit struct fields. Everything a node wants to
//! hand to downstream nodes goes through the open metadata side map, where
//! the last write for a key wins. The state is created by the executor at
//! pipeline start, mutated in place after each node, and discarded at
//! pipeline end; only the node records, the accumulated changes, and the
//! terminal branch name survive into the durable workflow record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::change::FileChange;
use crate::node::NodeResult;

/// Recorded outcome of one executed node, in plan order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node name as registered in the plan.
    pub node: String,
    /// Whether the node reported success.
    pub success: bool,
    /// Human-readable message from the node.
    pub message: String,
    /// Number of file changes the node contributed.
    pub changes_count: usize,
    /// Metadata the node emitted.
    pub metadata: HashMap<String, Value>,
}

/// In-process state shared across the nodes of a single pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    /// Opaque vault summary supplied by the caller at executor entry.
    pub vault_summary: Value,
    /// Strategy tag the plan is running under.
    pub strategy: String,
    /// User prompts, immutable within a run. The first is the primary prompt.
    pub prompts: Vec<String>,
    /// Ordered file changes contributed by executed nodes.
    pub accumulated_changes: Vec<FileChange>,
    /// One record per executed node, in execution order.
    pub node_results: Vec<NodeRecord>,
    /// One human-readable log line per executed node.
    pub messages: Vec<String>,
    /// Open metadata deposited by nodes for downstream consumption.
    metadata: HashMap<String, Value>,
}

impl PipelineState {
    /// Fresh state for one pipeline run.
    pub fn new(vault_summary: Value, strategy: impl Into<String>, prompts: Vec<String>) -> Self {
        Self {
            vault_summary,
            strategy: strategy.into(),
            prompts,
            ..Self::default()
        }
    }

    /// The primary (first) prompt, if any.
    pub fn primary_prompt(&self) -> Option<&str> {
        self.prompts.first().map(String::as_str)
    }

    /// Read an open metadata value by key.
    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Read an open metadata value as a string slice.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Look up the record of a previously executed node.
    pub fn node_record(&self, node: &str) -> Option<&NodeRecord> {
        self.node_results.iter().find(|record| record.node == node)
    }

    /// Fold a node's result into the state.
    ///
    /// Appends the changes, records the outcome, logs a message line, and
    /// merges the result metadata into the side map with last-write-wins
    /// semantics. Called by the executor for every node, including a
    /// failing one (its record is captured before the pipeline aborts).
    pub fn apply(&mut self, node: &str, result: NodeResult) {
        let NodeResult {
            success,
            changes,
            message,
            metadata,
        } = result;

        self.messages
            .push(format!("{}: {} ({} changes)", node, message, changes.len()));
        self.node_results.push(NodeRecord {
            node: node.to_string(),
            success,
            message,
            changes_count: changes.len(),
            metadata: metadata.clone(),
        });
        self.accumulated_changes.extend(changes);
        for (key, value) in metadata {
            self.metadata.insert(key, value);
        }
    }
}
