//! Workflow endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{
    ListWorkflowsQuery, RunWorkflowRequest, RunWorkflowResponse, WorkflowListResponse,
    WorkflowResponse,
};
use crate::api::routes::AppState;
use crate::dispatch::RunRequest;
use crate::workflow::WorkflowStatus;

/// Run a workflow of the given type.
///
/// `POST /workflows/{workflow_type}/run`
pub async fn run_workflow(
    State(state): State<AppState>,
    Path(workflow_type): Path<String>,
    Json(request): Json<RunWorkflowRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .dispatcher
        .run(
            &workflow_type,
            RunRequest {
                prompts: request.prompts,
                strategy: request.strategy,
                async_execution: request.async_execution,
            },
        )
        .await
        .map_err(ApiError::from)?;

    // A synchronous run that ended FAILED is still an accepted request; the
    // outcome is reported in the body and on the record.
    Ok((
        StatusCode::CREATED,
        Json(RunWorkflowResponse::from(outcome)),
    ))
}

/// Fetch one workflow record.
///
/// `GET /workflows/{id}`
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let record = state.registry.get(id).await.map_err(ApiError::from)?;
    Ok(Json(WorkflowResponse::from(record)))
}

/// List workflows with pagination and an optional status filter.
///
/// `GET /workflows?status=&limit=&offset=`
pub async fn list_workflows(
    State(state): State<AppState>,
    Query(query): Query<ListWorkflowsQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(10);
    if limit < 1 || limit > state.max_page_size {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            state.max_page_size
        )));
    }
    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::BadRequest("offset must not be negative".into()));
    }

    let status = match &query.status {
        Some(raw) => Some(WorkflowStatus::parse(raw).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Invalid status '{}'. Must be one of: PENDING, RUNNING, COMPLETED, FAILED",
                raw
            ))
        })?),
        None => None,
    };

    let (records, total) = state
        .registry
        .list(status, limit, offset)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(WorkflowListResponse {
        workflows: records.into_iter().map(WorkflowResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Liveness check including a database ping.
///
/// `GET /health`
pub async fn health(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state
        .db
        .health_check()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(Json(json!({"status": "ok"})))
}
