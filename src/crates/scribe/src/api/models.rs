//! API request and response DTOs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::DispatchOutcome;
use crate::workflow::WorkflowRecord;

/// Body of `POST /workflows/{type}/run`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunWorkflowRequest {
    /// User prompts; the first is the primary prompt.
    pub prompts: Vec<String>,

    /// Optional strategy override.
    #[serde(default)]
    pub strategy: Option<String>,

    /// Queue the run instead of executing inline.
    #[serde(default)]
    pub async_execution: bool,
}

/// Response of the run endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunWorkflowResponse {
    pub id: i64,
    pub status: String,
    pub async_task_id: Option<String>,
    pub message: String,
}

impl From<DispatchOutcome> for RunWorkflowResponse {
    fn from(outcome: DispatchOutcome) -> Self {
        Self {
            id: outcome.id,
            status: outcome.status.to_string(),
            async_task_id: outcome.task_id,
            message: outcome.message,
        }
    }
}

/// Full workflow record as returned by the read endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub id: i64,
    pub workflow_type: String,
    pub prompts: Vec<String>,
    pub strategy: Option<String>,
    pub status: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub branch_name: Option<String>,
    pub error_message: Option<String>,
    pub async_task_id: Option<String>,
    pub progress_message: Option<String>,
    pub progress_percent: Option<i64>,
    pub metadata: Value,
    pub created_at: String,
}

impl From<WorkflowRecord> for WorkflowResponse {
    fn from(record: WorkflowRecord) -> Self {
        Self {
            id: record.id,
            workflow_type: record.workflow_type,
            prompts: record.prompts,
            strategy: record.strategy,
            status: record.status.to_string(),
            started_at: record.started_at.map(|t| t.to_rfc3339()),
            completed_at: record.completed_at.map(|t| t.to_rfc3339()),
            branch_name: record.branch_name,
            error_message: record.error_message,
            async_task_id: record.task_id,
            progress_message: record.progress_message,
            progress_percent: record.progress_percent,
            metadata: Value::Object(record.metadata),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Response of the list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowListResponse {
    pub workflows: Vec<WorkflowResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Query parameters of the list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListWorkflowsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_defaults() {
        let req: RunWorkflowRequest =
            serde_json::from_str(r#"{"prompts": ["write about rust"]}"#).unwrap();
        assert_eq!(req.prompts.len(), 1);
        assert!(req.strategy.is_none());
        assert!(!req.async_execution);
    }

    #[test]
    fn test_run_request_full() {
        let req: RunWorkflowRequest = serde_json::from_str(
            r#"{"prompts": ["a"], "strategy": "research_proposal", "async_execution": true}"#,
        )
        .unwrap();
        assert_eq!(req.strategy.as_deref(), Some("research_proposal"));
        assert!(req.async_execution);
    }
}
