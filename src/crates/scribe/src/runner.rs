//! Drives one workflow record through the pipeline to a terminal state.
//!
//! Shared by the synchronous dispatch path and the async worker so both
//! observe identical semantics: vault summary injection, registry-backed
//! progress, wall-clock limits, and terminal bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use graph_core::{NodeRecord, PipelineInputs, ProgressCallback, WorkflowResult};

use crate::error::{Result, ScribeError};
use crate::graphs::{GraphCatalog, WorkflowGraph};
use crate::registry::WorkflowRegistry;
use crate::vault::VaultService;
use crate::workflow::{WorkflowRecord, WorkflowStatus};

/// Pipeline driver shared by dispatcher and worker.
pub struct PipelineRunner {
    registry: WorkflowRegistry,
    catalog: Arc<GraphCatalog>,
    vault: Arc<dyn VaultService>,
    time_limit: Duration,
    soft_time_limit: Duration,
}

impl PipelineRunner {
    pub fn new(
        registry: WorkflowRegistry,
        catalog: Arc<GraphCatalog>,
        vault: Arc<dyn VaultService>,
        time_limit: Duration,
        soft_time_limit: Duration,
    ) -> Self {
        Self {
            registry,
            catalog,
            vault,
            time_limit,
            soft_time_limit,
        }
    }

    /// Run the record's pipeline and land the record in a terminal state.
    ///
    /// Returns the terminal status with the message reported to the caller.
    /// Registry failures propagate after a best-effort terminal write; a
    /// record handed in here is never left RUNNING by this function unless
    /// the registry itself is down.
    pub async fn run_to_completion(
        &self,
        record: &WorkflowRecord,
    ) -> Result<(WorkflowStatus, String)> {
        let graph = match self.catalog.resolve(&record.workflow_type) {
            Ok(graph) => graph,
            Err(err) => {
                let message = err.to_string();
                self.registry
                    .mark_failed(record.id, &message, Map::new())
                    .await?;
                return Ok((WorkflowStatus::Failed, message));
            }
        };

        let vault_summary = serde_json::to_value(self.vault.summary())?;
        let inputs = PipelineInputs {
            vault_summary,
            prompts: record.prompts.clone(),
            strategy: record.strategy.clone(),
        };
        let progress = self.registry.progress_callback(record.id);

        match self.execute_with_limits(&graph, inputs, progress).await {
            Ok(result) if result.success => {
                self.registry
                    .mark_completed(record.id, &result.branch_name, completion_metadata(&result))
                    .await?;
                info!(id = record.id, branch = %result.branch_name, "Workflow completed");
                Ok((WorkflowStatus::Completed, result.summary))
            }
            Ok(result) => {
                self.registry
                    .mark_failed(record.id, &result.summary, failure_metadata(&result))
                    .await?;
                info!(id = record.id, error = %result.summary, "Workflow failed");
                Ok((WorkflowStatus::Failed, result.summary))
            }
            Err(err) => {
                let message = err.to_string();
                self.registry
                    .mark_failed(record.id, &message, Map::new())
                    .await?;
                warn!(id = record.id, error = %message, "Workflow aborted");
                Ok((WorkflowStatus::Failed, message))
            }
        }
    }

    /// Execute the pipeline under the soft and hard wall-clock limits.
    async fn execute_with_limits(
        &self,
        graph: &WorkflowGraph,
        inputs: PipelineInputs,
        progress: ProgressCallback,
    ) -> Result<WorkflowResult> {
        let soft = self.soft_time_limit.min(self.time_limit);
        let fut = graph.executor.run(&graph.plan, inputs, Some(progress));
        tokio::pin!(fut);

        match tokio::time::timeout(soft, &mut fut).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(soft_limit = ?soft, "Soft time limit exceeded, continuing until hard limit");
                let remaining = self.time_limit.saturating_sub(soft);
                match tokio::time::timeout(remaining, &mut fut).await {
                    Ok(result) => Ok(result?),
                    Err(_) => Err(ScribeError::Timeout(self.time_limit.as_secs())),
                }
            }
        }
    }
}

/// Metadata stored on COMPLETED: node results, change count, branch name.
fn completion_metadata(result: &WorkflowResult) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert(
        "node_results".to_string(),
        node_results_json(&result.node_results),
    );
    metadata.insert("total_changes".to_string(), json!(result.changes.len()));
    metadata.insert("branch_name".to_string(), json!(result.branch_name));
    metadata
}

/// Metadata stored on FAILED: the node results captured before the abort.
fn failure_metadata(result: &WorkflowResult) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert(
        "node_results".to_string(),
        node_results_json(&result.node_results),
    );
    metadata.insert("total_changes".to_string(), json!(result.changes.len()));
    metadata
}

/// Node records as a JSON object keyed by node name.
fn node_results_json(records: &[NodeRecord]) -> Value {
    let mut map = Map::new();
    for record in records {
        map.insert(
            record.node.clone(),
            json!({
                "success": record.success,
                "message": record.message,
                "changes_count": record.changes_count,
                "metadata": record.metadata,
            }),
        );
    }
    Value::Object(map)
}
