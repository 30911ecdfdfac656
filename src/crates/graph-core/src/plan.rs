//! Graph plans and the build-time node registry.
//!
//! A plan is plain data: an ordered list of node names plus a strategy tag.
//! The registry resolves those names to node instances when the executor is
//! built, so dynamic planning (e.g. a plan chosen from vault analysis) only
//! touches the single place that constructs the plan.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::node::Node;

/// Ordered node names plus a strategy tag. Immutable per workflow type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPlan {
    /// Node names in execution order.
    pub nodes: Vec<String>,
    /// Strategy identifier recorded on the workflow.
    pub strategy: String,
}

impl GraphPlan {
    /// Build a plan from node names and a strategy tag.
    pub fn new(nodes: Vec<String>, strategy: impl Into<String>) -> Self {
        Self {
            nodes,
            strategy: strategy.into(),
        }
    }
}

/// Build-time mapping of node names to instances.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, Arc<dyn Node>>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under its own name. Later registrations replace
    /// earlier ones with the same name.
    pub fn register(&mut self, node: Arc<dyn Node>) {
        self.nodes.insert(node.name().to_string(), node);
    }

    /// Resolve a node by name.
    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn Node>> {
        self.nodes
            .get(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))
    }

    /// Verify that every node a plan names is registered.
    pub fn validate_plan(&self, plan: &GraphPlan) -> Result<()> {
        for name in &plan.nodes {
            self.resolve(name)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}
