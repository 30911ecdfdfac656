//! Sequential pipeline executor.
//!
//! The executor walks a [`GraphPlan`] in order, injecting the shared
//! [`PipelineState`] into each node and folding the node's result back in.
//! Execution is strictly sequential within a run; suspension happens only at
//! the nodes' external I/O boundaries. The first failing node terminates the
//! run, and side effects already committed by earlier nodes are not undone.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::change::FileChange;
use crate::error::Result;
use crate::plan::{GraphPlan, NodeRegistry};
use crate::state::{NodeRecord, PipelineState};

/// Node name whose metadata supplies the terminal branch artifact.
const SUBMIT_NODE: &str = "submit_draft_branch";

/// Progress beacon sink injected by the caller.
///
/// The registry owns persistence; this callback is the only write path from
/// inside the executor. Percent values are clamped by the receiver.
pub type ProgressCallback = Arc<dyn Fn(String, i32) -> BoxFuture<'static, ()> + Send + Sync>;

/// Caller-supplied inputs for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    /// Opaque vault summary from the vault service.
    pub vault_summary: Value,
    /// User prompts; the first is the primary prompt.
    pub prompts: Vec<String>,
    /// Strategy override; falls back to the plan's strategy when absent.
    pub strategy: Option<String>,
}

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    /// Whether every node completed successfully.
    pub success: bool,
    /// All file changes accumulated across nodes.
    pub changes: Vec<FileChange>,
    /// Human-readable summary of the run.
    pub summary: String,
    /// One record per executed node, in execution order.
    pub node_results: Vec<NodeRecord>,
    /// Branch created by the submit node; empty when none was produced.
    pub branch_name: String,
}

/// Deterministic, sequential executor over a node registry.
pub struct PipelineExecutor {
    registry: NodeRegistry,
}

impl PipelineExecutor {
    /// Build an executor over a registry of node instances.
    pub fn new(registry: NodeRegistry) -> Self {
        Self { registry }
    }

    /// Execute a plan against fresh pipeline state.
    ///
    /// Returns `Err` only for programmer errors (a plan naming an
    /// unregistered node). Node failures produce a `WorkflowResult` with
    /// `success == false` and the node records captured so far, the failing
    /// node included.
    pub async fn run(
        &self,
        plan: &GraphPlan,
        inputs: PipelineInputs,
        progress: Option<ProgressCallback>,
    ) -> Result<WorkflowResult> {
        self.registry.validate_plan(plan)?;

        let strategy = inputs
            .strategy
            .unwrap_or_else(|| plan.strategy.clone());

        let mut state =
            PipelineState::new(inputs.vault_summary, strategy.clone(), inputs.prompts);

        let total = plan.nodes.len();
        info!(strategy = %strategy, nodes = total, "Starting pipeline run");

        for (index, name) in plan.nodes.iter().enumerate() {
            let node = self.registry.resolve(name)?;

            if let Some(progress) = &progress {
                let percent = (index * 100 / total.max(1)) as i32;
                progress(
                    format!("Running node '{}' ({}/{})", name, index + 1, total),
                    percent,
                )
                .await;
            }

            if !node.validate(&state) {
                warn!(node = %name, "Node validation failed");
                let message = "validation failed: required state is missing".to_string();
                state.apply(name, crate::node::NodeResult::failure(message.clone()));
                return Ok(Self::failed(state, name, &message));
            }

            debug!(node = %name, "Executing node");
            let result = match node.execute(&state).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(node = %name, error = %err, "Node returned an error");
                    let message = err.to_string();
                    state.apply(name, crate::node::NodeResult::failure(message.clone()));
                    return Ok(Self::failed(state, name, &message));
                }
            };

            let succeeded = result.success;
            let message = result.message.clone();
            state.apply(name, result);

            if !succeeded {
                warn!(node = %name, message = %message, "Node reported failure");
                return Ok(Self::failed(state, name, &message));
            }
            debug!(node = %name, message = %message, "Node completed");
        }

        let summary = Self::summarize(&state);
        let branch_name = Self::branch_name(&state);
        info!(branch = %branch_name, "Pipeline run completed");

        Ok(WorkflowResult {
            success: true,
            changes: state.accumulated_changes,
            summary,
            node_results: state.node_results,
            branch_name,
        })
    }

    fn failed(state: PipelineState, node: &str, message: &str) -> WorkflowResult {
        WorkflowResult {
            success: false,
            changes: state.accumulated_changes,
            summary: format!("Node {} failed: {}", node, message),
            node_results: state.node_results,
            branch_name: String::new(),
        }
    }

    fn branch_name(state: &PipelineState) -> String {
        state
            .node_record(SUBMIT_NODE)
            .and_then(|record| record.metadata.get("branch_name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn summarize(state: &PipelineState) -> String {
        let successful = state
            .node_results
            .iter()
            .filter(|record| record.success)
            .count();
        let total_changes: usize = state
            .node_results
            .iter()
            .map(|record| record.changes_count)
            .sum();

        let mut lines = vec![
            format!("Workflow completed with '{}' strategy.", state.strategy),
            format!(
                "Executed {}/{} nodes successfully.",
                successful,
                state.node_results.len()
            ),
            format!("Total changes: {} file operations.", total_changes),
        ];
        for record in &state.node_results {
            if record.success {
                lines.push(format!("- {}: {}", record.node, record.message));
            }
        }
        lines.join("\n")
    }
}

impl fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("registry", &self.registry)
            .finish()
    }
}
