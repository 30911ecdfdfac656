//! In-process task queue and async worker.
//!
//! The queue is a bounded channel of workflow ids; the worker owns the
//! receiving half and drives each task through the shared pipeline runner.
//! Delivery is at-least-once from the consumer's perspective, so the worker
//! re-checks record status before executing and refuses terminal records.

use std::sync::Arc;

use serde_json::Map;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{Result, ScribeError};
use crate::registry::WorkflowRegistry;
use crate::runner::PipelineRunner;
use crate::workflow::WorkflowStatus;

/// One queued unit of asynchronous work.
#[derive(Debug, Clone)]
pub struct WorkflowTask {
    /// Durable record the task drives.
    pub workflow_id: i64,
    /// Correlation id recorded on the workflow at dispatch time.
    pub task_id: String,
}

/// Producer half of the task queue.
#[derive(Clone, Debug)]
pub struct TaskQueue {
    tx: mpsc::Sender<WorkflowTask>,
}

impl TaskQueue {
    /// Create a bounded queue, returning the producer and the receiver the
    /// worker consumes.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<WorkflowTask>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue a task, waiting for capacity if the queue is full.
    pub async fn enqueue(&self, task: WorkflowTask) -> Result<()> {
        self.tx
            .send(task)
            .await
            .map_err(|_| ScribeError::Queue("task queue is closed".to_string()))
    }
}

/// Long-running consumer executing queued workflows.
pub struct Worker {
    registry: WorkflowRegistry,
    runner: Arc<PipelineRunner>,
}

impl Worker {
    pub fn new(registry: WorkflowRegistry, runner: Arc<PipelineRunner>) -> Self {
        Self { registry, runner }
    }

    /// Spawn the worker loop onto the runtime.
    pub fn spawn(self, rx: mpsc::Receiver<WorkflowTask>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }

    /// Drain the queue until it closes.
    pub async fn run(self, mut rx: mpsc::Receiver<WorkflowTask>) {
        while let Some(task) = rx.recv().await {
            self.process(task).await;
        }
        info!("Task queue closed, worker stopping");
    }

    async fn process(&self, task: WorkflowTask) {
        let record = match self.registry.get(task.workflow_id).await {
            Ok(record) => record,
            Err(ScribeError::NotFound(id)) => {
                warn!(id, task_id = %task.task_id, "Dropping task for unknown workflow");
                return;
            }
            Err(err) => {
                error!(
                    id = task.workflow_id,
                    error = %err,
                    "Failed to load workflow for queued task"
                );
                return;
            }
        };

        if record.status.is_terminal() {
            // Duplicate delivery; the record already ran.
            info!(id = record.id, status = %record.status, "Refusing to re-execute terminal workflow");
            return;
        }

        if record.status != WorkflowStatus::Running {
            // Dispatch marks records RUNNING before enqueueing; anything
            // else here means the dispatch path was interrupted.
            let message = format!(
                "unexpected state: workflow was {} at pickup",
                record.status
            );
            if let Err(err) = self
                .registry
                .mark_failed(record.id, &message, Map::new())
                .await
            {
                error!(id = record.id, error = %err, "Failed to fail out-of-state workflow");
            }
            return;
        }

        match self.runner.run_to_completion(&record).await {
            Ok((status, _)) => {
                info!(id = record.id, status = %status, task_id = %task.task_id, "Queued workflow finished");
            }
            Err(err) => {
                error!(id = record.id, error = %err, "Queued workflow aborted");
                if let Err(mark_err) = self
                    .registry
                    .mark_failed(record.id, &err.to_string(), Map::new())
                    .await
                {
                    error!(id = record.id, error = %mark_err, "Failed to record workflow failure");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::graphs::{GraphCatalog, ARTICLE_PROPOSAL};
    use crate::vault::FsVaultService;
    use clients::{MockDraftClient, MockLlmClient, MockResearchClient};
    use std::time::Duration;

    async fn setup() -> (WorkflowRegistry, Arc<PipelineRunner>) {
        let registry = WorkflowRegistry::new(Arc::new(Database::test_in_memory().await.unwrap()));
        let catalog = GraphCatalog::with_article_proposal(
            Arc::new(MockLlmClient::new()),
            Arc::new(MockResearchClient::new()),
            Arc::new(MockDraftClient::new()),
        );
        let runner = Arc::new(PipelineRunner::new(
            registry.clone(),
            Arc::new(catalog),
            Arc::new(FsVaultService::new(None)),
            Duration::from_secs(600),
            Duration::from_secs(540),
        ));
        (registry, runner)
    }

    #[tokio::test]
    async fn test_worker_completes_running_workflow() {
        let (registry, runner) = setup().await;
        let id = registry
            .create(ARTICLE_PROPOSAL, &["write about rust".to_string()], None)
            .await
            .unwrap();
        registry.mark_running(id, Some("task-1")).await.unwrap();

        let worker = Worker::new(registry.clone(), runner);
        worker
            .process(WorkflowTask {
                workflow_id: id,
                task_id: "task-1".to_string(),
            })
            .await;

        let record = registry.get(id).await.unwrap();
        assert_eq!(record.status, WorkflowStatus::Completed);
    }

    #[tokio::test]
    async fn test_worker_fails_pending_workflow() {
        let (registry, runner) = setup().await;
        let id = registry
            .create(ARTICLE_PROPOSAL, &["write about rust".to_string()], None)
            .await
            .unwrap();

        let worker = Worker::new(registry.clone(), runner);
        worker
            .process(WorkflowTask {
                workflow_id: id,
                task_id: "task-1".to_string(),
            })
            .await;

        let record = registry.get(id).await.unwrap();
        assert_eq!(record.status, WorkflowStatus::Failed);
        assert!(record.error_message.unwrap().contains("unexpected state"));
    }

    #[tokio::test]
    async fn test_worker_refuses_terminal_workflow() {
        let (registry, runner) = setup().await;
        let id = registry
            .create(ARTICLE_PROPOSAL, &["write about rust".to_string()], None)
            .await
            .unwrap();
        registry.mark_running(id, None).await.unwrap();
        registry
            .mark_failed(id, "already done", Map::new())
            .await
            .unwrap();

        let worker = Worker::new(registry.clone(), runner);
        worker
            .process(WorkflowTask {
                workflow_id: id,
                task_id: "task-1".to_string(),
            })
            .await;

        // Duplicate delivery leaves the terminal record untouched.
        let record = registry.get(id).await.unwrap();
        assert_eq!(record.status, WorkflowStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("already done"));
    }

    #[tokio::test]
    async fn test_worker_drops_unknown_workflow() {
        let (registry, runner) = setup().await;
        let worker = Worker::new(registry, runner);
        // Must not panic.
        worker
            .process(WorkflowTask {
                workflow_id: 9999,
                task_id: "ghost".to_string(),
            })
            .await;
    }

    #[tokio::test]
    async fn test_spawned_worker_drains_queue() {
        let (registry, runner) = setup().await;
        let id = registry
            .create(ARTICLE_PROPOSAL, &["write about rust".to_string()], None)
            .await
            .unwrap();
        registry.mark_running(id, Some("task-1")).await.unwrap();

        let (queue, rx) = TaskQueue::bounded(4);
        let handle = Worker::new(registry.clone(), runner).spawn(rx);

        queue
            .enqueue(WorkflowTask {
                workflow_id: id,
                task_id: "task-1".to_string(),
            })
            .await
            .unwrap();
        drop(queue);
        handle.await.unwrap();

        let record = registry.get(id).await.unwrap();
        assert_eq!(record.status, WorkflowStatus::Completed);
    }
}
