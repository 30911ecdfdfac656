//! Durable workflow registry.
//!
//! Sole custodian of workflow records; every lifecycle change funnels
//! through here. Each mutating operation is a single status-guarded
//! `UPDATE` (compare-and-set on the status column), which serializes writes
//! per record and keeps them atomic with respect to concurrent reads.
//! Terminal marks are idempotent under queue re-delivery: applying them to
//! an already-terminal record is a no-op that touches no fields.

use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use graph_core::ProgressCallback;

use crate::db::Database;
use crate::error::{Result, ScribeError};
use crate::workflow::{
    format_timestamp, transition, WorkflowEvent, WorkflowRecord, WorkflowStatus,
};

/// Longest progress message persisted to a record.
const MAX_PROGRESS_MESSAGE_CHARS: usize = 500;

/// Repository of durable workflow records.
#[derive(Clone, Debug)]
pub struct WorkflowRegistry {
    db: Arc<Database>,
}

impl WorkflowRegistry {
    /// Create a registry over a database connection.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new record in PENDING and return its id.
    pub async fn create(
        &self,
        workflow_type: &str,
        prompts: &[String],
        strategy: Option<&str>,
    ) -> Result<i64> {
        let prompts_json = serde_json::to_string(prompts)?;
        let created_at = format_timestamp(Utc::now());

        let result = sqlx::query(
            "INSERT INTO workflows (workflow_type, prompts, status, strategy, metadata, created_at)
             VALUES (?, ?, 'PENDING', ?, '{}', ?)",
        )
        .bind(workflow_type)
        .bind(&prompts_json)
        .bind(strategy)
        .bind(&created_at)
        .execute(self.db.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// PENDING → RUNNING; records the start time and the async correlation
    /// id when present.
    pub async fn mark_running(&self, id: i64, task_id: Option<&str>) -> Result<()> {
        let started_at = format_timestamp(Utc::now());

        let rows = sqlx::query(
            "UPDATE workflows SET status = 'RUNNING', started_at = ?, task_id = ?
             WHERE id = ? AND status = 'PENDING'",
        )
        .bind(&started_at)
        .bind(task_id)
        .bind(id)
        .execute(self.db.pool())
        .await?
        .rows_affected();

        if rows == 0 {
            let record = self.get(id).await?;
            return Err(self.invalid_transition(&record, WorkflowEvent::Start));
        }
        Ok(())
    }

    /// Persist a progress beacon. Permitted only while RUNNING; a beacon
    /// that races the terminal write is dropped rather than treated as an
    /// error. Percent is clamped into [0, 100], the message truncated to
    /// 500 characters. Replaying an identical beacon leaves the record
    /// unchanged.
    pub async fn report_progress(&self, id: i64, message: &str, percent: i32) -> Result<()> {
        let percent = percent.clamp(0, 100);
        let message = clip(message, MAX_PROGRESS_MESSAGE_CHARS);

        let rows = sqlx::query(
            "UPDATE workflows SET progress_message = ?, progress_percent = ?
             WHERE id = ? AND status = 'RUNNING'",
        )
        .bind(&message)
        .bind(percent)
        .bind(id)
        .execute(self.db.pool())
        .await?
        .rows_affected();

        if rows == 0 {
            // Distinguish a missing record from a record that already went
            // terminal; the latter just drops the beacon.
            let record = self.get(id).await?;
            debug!(
                id,
                status = %record.status,
                "Dropping progress beacon for non-running workflow"
            );
        }
        Ok(())
    }

    /// RUNNING → COMPLETED; merges the given metadata into the record's
    /// metadata map. A second application to a terminal record is a no-op.
    pub async fn mark_completed(
        &self,
        id: i64,
        branch_name: &str,
        metadata: Map<String, Value>,
    ) -> Result<()> {
        let record = self.get(id).await?;
        if record.status.is_terminal() {
            debug!(id, status = %record.status, "mark_completed on terminal record is a no-op");
            return Ok(());
        }
        if transition(record.status, WorkflowEvent::Succeed).is_none() {
            return Err(self.invalid_transition(&record, WorkflowEvent::Succeed));
        }

        let mut merged = record.metadata;
        for (key, value) in metadata {
            merged.insert(key, value);
        }
        let metadata_json = serde_json::to_string(&merged)?;
        let completed_at = format_timestamp(Utc::now());
        let branch = (!branch_name.is_empty()).then_some(branch_name);

        let rows = sqlx::query(
            "UPDATE workflows
             SET status = 'COMPLETED', completed_at = ?, branch_name = ?, metadata = ?,
                 progress_message = 'completed', progress_percent = 100
             WHERE id = ? AND status = 'RUNNING'",
        )
        .bind(&completed_at)
        .bind(branch)
        .bind(&metadata_json)
        .bind(id)
        .execute(self.db.pool())
        .await?
        .rows_affected();

        if rows == 0 {
            // Lost a race with another writer; terminal is fine, anything
            // else is a genuine transition violation.
            let record = self.get(id).await?;
            if record.status.is_terminal() {
                return Ok(());
            }
            return Err(self.invalid_transition(&record, WorkflowEvent::Succeed));
        }
        Ok(())
    }

    /// RUNNING → FAILED, or defensively PENDING → FAILED when the run never
    /// started (the start time is backfilled so terminal invariants hold).
    /// Merges the given metadata; a second application to a terminal record
    /// is a no-op.
    pub async fn mark_failed(
        &self,
        id: i64,
        error_message: &str,
        metadata: Map<String, Value>,
    ) -> Result<()> {
        let record = self.get(id).await?;
        if record.status.is_terminal() {
            debug!(id, status = %record.status, "mark_failed on terminal record is a no-op");
            return Ok(());
        }

        let mut merged = record.metadata;
        for (key, value) in metadata {
            merged.insert(key, value);
        }
        let metadata_json = serde_json::to_string(&merged)?;
        let completed_at = format_timestamp(Utc::now());
        let progress = clip(error_message, MAX_PROGRESS_MESSAGE_CHARS);

        let rows = sqlx::query(
            "UPDATE workflows
             SET status = 'FAILED', completed_at = ?, started_at = COALESCE(started_at, ?),
                 error_message = ?, metadata = ?, progress_message = ?, progress_percent = 100
             WHERE id = ? AND status IN ('PENDING', 'RUNNING')",
        )
        .bind(&completed_at)
        .bind(&completed_at)
        .bind(error_message)
        .bind(&metadata_json)
        .bind(&progress)
        .bind(id)
        .execute(self.db.pool())
        .await?
        .rows_affected();

        if rows == 0 {
            let record = self.get(id).await?;
            if record.status.is_terminal() {
                return Ok(());
            }
            return Err(self.invalid_transition(&record, WorkflowEvent::Fail));
        }
        Ok(())
    }

    /// Fetch a record by id.
    pub async fn get(&self, id: i64) -> Result<WorkflowRecord> {
        let row = sqlx::query("SELECT * FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(ScribeError::NotFound(id))?;

        WorkflowRecord::from_row(&row)
    }

    /// List records newest-first, optionally filtered by status, with the
    /// unfiltered-by-pagination total count.
    pub async fn list(
        &self,
        status: Option<WorkflowStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<WorkflowRecord>, i64)> {
        if limit < 1 {
            return Err(ScribeError::InvalidInput(
                "limit must be at least 1".to_string(),
            ));
        }
        if offset < 0 {
            return Err(ScribeError::InvalidInput(
                "offset must not be negative".to_string(),
            ));
        }

        let (total, rows) = match status {
            Some(status) => {
                let total: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM workflows WHERE status = ?")
                        .bind(status.as_str())
                        .fetch_one(self.db.pool())
                        .await?;
                let rows = sqlx::query(
                    "SELECT * FROM workflows WHERE status = ?
                     ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                )
                .bind(status.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(self.db.pool())
                .await?;
                (total, rows)
            }
            None => {
                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workflows")
                    .fetch_one(self.db.pool())
                    .await?;
                let rows = sqlx::query(
                    "SELECT * FROM workflows
                     ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(self.db.pool())
                .await?;
                (total, rows)
            }
        };

        let records = rows
            .iter()
            .map(WorkflowRecord::from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok((records, total))
    }

    /// Progress sink bound to one record, injected into the executor.
    ///
    /// Persistence failures are logged and swallowed: a lost beacon must
    /// not abort a pipeline.
    pub fn progress_callback(&self, id: i64) -> ProgressCallback {
        let registry = self.clone();
        Arc::new(move |message: String, percent: i32| -> BoxFuture<'static, ()> {
            let registry = registry.clone();
            Box::pin(async move {
                if let Err(err) = registry.report_progress(id, &message, percent).await {
                    warn!(id, error = %err, "Failed to persist progress beacon");
                }
            })
        })
    }

    fn invalid_transition(&self, record: &WorkflowRecord, event: WorkflowEvent) -> ScribeError {
        ScribeError::InvalidTransition {
            id: record.id,
            status: record.status,
            event: event.as_str(),
        }
    }
}

/// Truncate to a maximum number of characters without splitting one.
fn clip(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}
