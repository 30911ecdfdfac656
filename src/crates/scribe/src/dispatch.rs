//! Dispatcher: the sole entry point that creates workflow records.
//!
//! Resolves the graph for a workflow type, validates and normalizes the
//! prompts, writes the PENDING record, and routes the run to the inline
//! executor or the async queue. Validation failures never touch storage;
//! failures after the record exists always leave it in a terminal state
//! rather than pinned in PENDING.

use std::sync::Arc;

use serde_json::Map;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, ScribeError};
use crate::graphs::GraphCatalog;
use crate::queue::{TaskQueue, WorkflowTask};
use crate::registry::WorkflowRegistry;
use crate::runner::PipelineRunner;
use crate::workflow::WorkflowStatus;

/// Parameters for one workflow run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// User prompts; the first is the primary prompt.
    pub prompts: Vec<String>,
    /// Optional strategy override.
    pub strategy: Option<String>,
    /// Queue the run instead of executing inline.
    pub async_execution: bool,
}

/// Result of dispatching a run.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub id: i64,
    pub status: WorkflowStatus,
    pub task_id: Option<String>,
    pub message: String,
}

/// Entry point from the HTTP adapter.
pub struct Dispatcher {
    registry: WorkflowRegistry,
    catalog: Arc<GraphCatalog>,
    queue: TaskQueue,
    runner: Arc<PipelineRunner>,
}

impl Dispatcher {
    pub fn new(
        registry: WorkflowRegistry,
        catalog: Arc<GraphCatalog>,
        queue: TaskQueue,
        runner: Arc<PipelineRunner>,
    ) -> Self {
        Self {
            registry,
            catalog,
            queue,
            runner,
        }
    }

    /// Run a workflow of the given type.
    pub async fn run(&self, workflow_type: &str, request: RunRequest) -> Result<DispatchOutcome> {
        // Resolve before any durable write: an unknown type is the caller's
        // error and must not create a record.
        self.catalog.resolve(workflow_type)?;
        let prompts = normalize_prompts(&request.prompts)?;

        let id = self
            .registry
            .create(workflow_type, &prompts, request.strategy.as_deref())
            .await?;
        info!(id, workflow_type, async_execution = request.async_execution, "Workflow created");

        if request.async_execution {
            self.dispatch_async(id).await
        } else {
            self.dispatch_sync(id).await
        }
    }

    /// Mark the record RUNNING at dispatch time, then hand it to the queue.
    ///
    /// The worker does not re-transition; clients polling immediately after
    /// dispatch already observe RUNNING with a "queued" beacon.
    async fn dispatch_async(&self, id: i64) -> Result<DispatchOutcome> {
        let task_id = Uuid::new_v4().to_string();

        if let Err(err) = self.start_queued(id, &task_id).await {
            warn!(id, error = %err, "Async dispatch failed, failing workflow");
            self.registry
                .mark_failed(id, &format!("Failed to queue workflow: {}", err), Map::new())
                .await
                .ok();
            return Err(err);
        }

        Ok(DispatchOutcome {
            id,
            status: WorkflowStatus::Running,
            task_id: Some(task_id),
            message: "Workflow queued for asynchronous execution".to_string(),
        })
    }

    async fn start_queued(&self, id: i64, task_id: &str) -> Result<()> {
        // RUNNING before enqueue: the worker checks for RUNNING at pickup,
        // so the transition must be visible before the task can be consumed.
        self.registry.mark_running(id, Some(task_id)).await?;
        self.registry.report_progress(id, "queued", 0).await?;
        self.queue
            .enqueue(WorkflowTask {
                workflow_id: id,
                task_id: task_id.to_string(),
            })
            .await
    }

    /// Execute inline and answer with the terminal outcome.
    async fn dispatch_sync(&self, id: i64) -> Result<DispatchOutcome> {
        if let Err(err) = self.registry.mark_running(id, None).await {
            self.registry
                .mark_failed(id, &format!("Failed to start workflow: {}", err), Map::new())
                .await
                .ok();
            return Err(err);
        }
        self.registry.report_progress(id, "started", 0).await?;

        let record = self.registry.get(id).await?;
        let (status, message) = self.runner.run_to_completion(&record).await?;

        Ok(DispatchOutcome {
            id,
            status,
            task_id: None,
            message,
        })
    }
}

/// Trim every prompt and reject empty input.
fn normalize_prompts(prompts: &[String]) -> Result<Vec<String>> {
    if prompts.is_empty() {
        return Err(ScribeError::InvalidInput(
            "at least one prompt is required".to_string(),
        ));
    }

    let mut normalized = Vec::with_capacity(prompts.len());
    for prompt in prompts {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return Err(ScribeError::InvalidInput(
                "prompts must not be empty or whitespace-only".to_string(),
            ));
        }
        normalized.push(trimmed.to_string());
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::graphs::ARTICLE_PROPOSAL;
    use crate::vault::FsVaultService;
    use clients::{MockDraftClient, MockLlmClient, MockResearchClient};
    use std::time::Duration;

    async fn setup() -> (Dispatcher, WorkflowRegistry) {
        let registry = WorkflowRegistry::new(Arc::new(Database::test_in_memory().await.unwrap()));
        let catalog = Arc::new(GraphCatalog::with_article_proposal(
            Arc::new(MockLlmClient::new()),
            Arc::new(MockResearchClient::new()),
            Arc::new(MockDraftClient::new()),
        ));
        let runner = Arc::new(PipelineRunner::new(
            registry.clone(),
            catalog.clone(),
            Arc::new(FsVaultService::new(None)),
            Duration::from_secs(600),
            Duration::from_secs(540),
        ));
        let (queue, rx) = TaskQueue::bounded(8);
        crate::queue::Worker::new(registry.clone(), runner.clone()).spawn(rx);

        (
            Dispatcher::new(registry.clone(), catalog, queue, runner),
            registry,
        )
    }

    fn request(prompts: &[&str], async_execution: bool) -> RunRequest {
        RunRequest {
            prompts: prompts.iter().map(|p| p.to_string()).collect(),
            strategy: None,
            async_execution,
        }
    }

    #[tokio::test]
    async fn test_unknown_type_creates_no_record() {
        let (dispatcher, registry) = setup().await;

        let err = dispatcher
            .run("not-a-real-type", request(&["topic"], false))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::UnknownWorkflowType { .. }));

        let (_, total) = registry.list(None, 10, 0).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_invalid_prompts_create_no_record() {
        let (dispatcher, registry) = setup().await;

        for prompts in [vec![], vec!["   "]] {
            let err = dispatcher
                .run(ARTICLE_PROPOSAL, request(&prompts, false))
                .await
                .unwrap_err();
            assert!(matches!(err, ScribeError::InvalidInput(_)));
        }

        let (_, total) = registry.list(None, 10, 0).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_sync_dispatch_completes() {
        let (dispatcher, registry) = setup().await;

        let outcome = dispatcher
            .run(ARTICLE_PROPOSAL, request(&["Impact of transformers on NLP"], false))
            .await
            .unwrap();

        assert_eq!(outcome.status, WorkflowStatus::Completed);
        assert!(outcome.task_id.is_none());

        let record = registry.get(outcome.id).await.unwrap();
        assert_eq!(record.status, WorkflowStatus::Completed);
        assert!(record.branch_name.is_some());
        assert!(record.task_id.is_none());
    }

    #[tokio::test]
    async fn test_async_dispatch_returns_running() {
        let (dispatcher, registry) = setup().await;

        let outcome = dispatcher
            .run(ARTICLE_PROPOSAL, request(&["Impact of transformers on NLP"], true))
            .await
            .unwrap();

        assert_eq!(outcome.status, WorkflowStatus::Running);
        let task_id = outcome.task_id.expect("async dispatch returns a task id");

        // Poll until the worker lands the record terminally.
        let mut record = registry.get(outcome.id).await.unwrap();
        for _ in 0..100 {
            if record.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            record = registry.get(outcome.id).await.unwrap();
        }

        assert_eq!(record.status, WorkflowStatus::Completed);
        assert_eq!(record.task_id.as_deref(), Some(task_id.as_str()));
        assert!(record.branch_name.is_some());
    }

    #[tokio::test]
    async fn test_prompts_are_trimmed() {
        let (dispatcher, registry) = setup().await;

        let outcome = dispatcher
            .run(ARTICLE_PROPOSAL, request(&["  padded prompt  "], false))
            .await
            .unwrap();

        let record = registry.get(outcome.id).await.unwrap();
        assert_eq!(record.prompts, vec!["padded prompt"]);
    }

    #[test]
    fn test_normalize_rejects_blank_member() {
        let err = normalize_prompts(&["fine".to_string(), " ".to_string()]).unwrap_err();
        assert!(matches!(err, ScribeError::InvalidInput(_)));
    }
}
