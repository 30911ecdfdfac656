//! Durable workflow record model and the status state machine.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::{Result, ScribeError};

/// Lifecycle status of a workflow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl WorkflowStatus {
    /// Canonical uppercase form persisted to the database and the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Parse the canonical uppercase form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "RUNNING" => Some(Self::Running),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether the status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle events a record can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// PENDING → RUNNING.
    Start,
    /// RUNNING → COMPLETED.
    Succeed,
    /// RUNNING → FAILED, or defensively PENDING → FAILED when the run never
    /// started.
    Fail,
}

impl WorkflowEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Succeed => "succeed",
            Self::Fail => "fail",
        }
    }
}

/// The state machine as an exhaustive transition function.
///
/// Returns `None` for illegal transitions; callers turn that into
/// [`ScribeError::InvalidTransition`] with record context. Terminal states
/// accept no events here — idempotent re-delivery of terminal marks is
/// handled by the registry, not the state machine.
pub fn transition(status: WorkflowStatus, event: WorkflowEvent) -> Option<WorkflowStatus> {
    use WorkflowEvent::*;
    use WorkflowStatus::*;

    match (status, event) {
        (Pending, Start) => Some(Running),
        (Running, Succeed) => Some(Completed),
        (Running, Fail) => Some(Failed),
        (Pending, Fail) => Some(Failed),
        (Pending, Succeed) | (Running, Start) => None,
        (Completed, _) | (Failed, _) => None,
    }
}

/// One durable workflow record.
#[derive(Debug, Clone)]
pub struct WorkflowRecord {
    pub id: i64,
    pub workflow_type: String,
    pub prompts: Vec<String>,
    pub strategy: Option<String>,
    pub status: WorkflowStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub branch_name: Option<String>,
    pub error_message: Option<String>,
    pub task_id: Option<String>,
    pub progress_message: Option<String>,
    pub progress_percent: Option<i64>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl WorkflowRecord {
    /// Map a database row into a record.
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self> {
        let status_raw: String = row.get("status");
        let status = WorkflowStatus::parse(&status_raw)
            .ok_or_else(|| ScribeError::Database(format!("unknown status '{}'", status_raw)))?;

        let prompts_raw: String = row.get("prompts");
        let prompts: Vec<String> = serde_json::from_str(&prompts_raw)
            .map_err(|e| ScribeError::Database(format!("malformed prompts column: {}", e)))?;

        let metadata_raw: String = row.get("metadata");
        let metadata: Map<String, Value> = serde_json::from_str(&metadata_raw)
            .map_err(|e| ScribeError::Database(format!("malformed metadata column: {}", e)))?;

        Ok(Self {
            id: row.get("id"),
            workflow_type: row.get("workflow_type"),
            prompts,
            strategy: row.get("strategy"),
            status,
            started_at: parse_optional_timestamp(row.get("started_at"))?,
            completed_at: parse_optional_timestamp(row.get("completed_at"))?,
            branch_name: row.get("branch_name"),
            error_message: row.get("error_message"),
            task_id: row.get("task_id"),
            progress_message: row.get("progress_message"),
            progress_percent: row.get("progress_percent"),
            metadata,
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        })
    }
}

/// Fixed-width UTC timestamp for storage; sorts lexicographically.
pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ScribeError::Database(format!("malformed timestamp '{}': {}", value, e)))
}

fn parse_optional_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            WorkflowStatus::Pending,
            WorkflowStatus::Running,
            WorkflowStatus::Completed,
            WorkflowStatus::Failed,
        ] {
            assert_eq!(WorkflowStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(WorkflowStatus::parse("pending"), None);
        assert_eq!(WorkflowStatus::parse("DONE"), None);
    }

    #[test]
    fn test_legal_transitions() {
        use WorkflowEvent::*;
        use WorkflowStatus::*;

        assert_eq!(transition(Pending, Start), Some(Running));
        assert_eq!(transition(Running, Succeed), Some(Completed));
        assert_eq!(transition(Running, Fail), Some(Failed));
        assert_eq!(transition(Pending, Fail), Some(Failed));
    }

    #[test]
    fn test_illegal_transitions() {
        use WorkflowEvent::*;
        use WorkflowStatus::*;

        assert_eq!(transition(Pending, Succeed), None);
        assert_eq!(transition(Running, Start), None);
        for terminal in [Completed, Failed] {
            for event in [Start, Succeed, Fail] {
                assert_eq!(transition(terminal, event), None);
            }
        }
    }

    #[test]
    fn test_terminal_flags() {
        assert!(!WorkflowStatus::Pending.is_terminal());
        assert!(!WorkflowStatus::Running.is_terminal());
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(WorkflowStatus::Failed.is_terminal());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let now = Utc::now();
        let text = format_timestamp(now);
        let parsed = parse_timestamp(&text).unwrap();
        assert_eq!(format_timestamp(parsed), text);
    }

    #[test]
    fn test_timestamps_sort_lexicographically() {
        let earlier = format_timestamp(Utc::now());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = format_timestamp(Utc::now());
        assert!(later > earlier);
    }
}
