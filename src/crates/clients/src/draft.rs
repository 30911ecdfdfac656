//! Draft-branch gateway client.
//!
//! The gateway turns a set of draft files into a branch in the remote vault
//! repository and answers with the created branch name. A blank branch name
//! in the payload is an invalid response; the caller decides what a missing
//! branch means for the workflow.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};

/// One file to include in the draft branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftFile {
    /// File name within the drafts area.
    pub file_name: String,
    /// Full file content.
    pub content: String,
}

/// Client for the draft-branch gateway.
#[async_trait]
pub trait DraftBranchClient: Send + Sync {
    /// Create a draft branch containing the given files and return its name.
    async fn create_draft_branch(&self, drafts: Vec<DraftFile>) -> Result<String>;
}

/// HTTP client for the gateway service.
#[derive(Clone)]
pub struct DraftGatewayClient {
    base_url: String,
    client: Client,
}

impl DraftGatewayClient {
    /// Create a client against the given base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Serialize)]
struct CreateDraftsRequest {
    drafts: Vec<DraftFile>,
}

#[derive(Deserialize)]
struct CreateDraftsResponse {
    branch_name: String,
}

#[async_trait]
impl DraftBranchClient for DraftGatewayClient {
    async fn create_draft_branch(&self, drafts: Vec<DraftFile>) -> Result<String> {
        let url = format!("{}/drafts", self.base_url);
        debug!(url = %url, files = drafts.len(), "Submitting draft branch");

        let response = self
            .client
            .post(&url)
            .json(&CreateDraftsRequest { drafts })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Api(format!(
                "draft gateway returned status {}",
                response.status()
            )));
        }

        let payload: CreateDraftsResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("malformed drafts payload: {}", e)))?;

        Ok(payload.branch_name)
    }
}

/// Mock gateway deriving a branch name from the first draft file.
#[derive(Debug, Clone, Default)]
pub struct MockDraftClient {
    branch: Option<String>,
}

impl MockDraftClient {
    /// Mock deriving `drafts/<file stem>` from the submitted file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that always answers with the given branch name. An empty string
    /// exercises the callers' empty-branch failure path.
    pub fn with_branch(branch: impl Into<String>) -> Self {
        Self {
            branch: Some(branch.into()),
        }
    }
}

#[async_trait]
impl DraftBranchClient for MockDraftClient {
    async fn create_draft_branch(&self, drafts: Vec<DraftFile>) -> Result<String> {
        if let Some(branch) = &self.branch {
            return Ok(branch.clone());
        }
        let stem = drafts
            .first()
            .map(|draft| draft.file_name.trim_end_matches(".md").to_string())
            .unwrap_or_else(|| "draft".to_string());
        Ok(format!("drafts/{}", stem))
    }
}
