//! Submit-draft-branch node.
//!
//! Final stage: takes the single proposal file accumulated by the pipeline
//! and submits it to the draft gateway, which answers with the created
//! branch name. Exactly one `Create` change with non-empty content is
//! required; anything else fails the node rather than the engine.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use clients::{DraftBranchClient, DraftFile};
use graph_core::{FileChange, Node, NodeResult, PipelineState};

/// Node submitting the accumulated draft to the gateway.
pub struct SubmitDraftBranchNode {
    gateway: Arc<dyn DraftBranchClient>,
}

impl SubmitDraftBranchNode {
    pub fn new(gateway: Arc<dyn DraftBranchClient>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Node for SubmitDraftBranchNode {
    fn name(&self) -> &str {
        "submit_draft_branch"
    }

    fn validate(&self, _state: &PipelineState) -> bool {
        // The typed state always carries the slots this node reads; content
        // checks happen in execute so they surface as node failures with
        // specific messages.
        true
    }

    async fn execute(&self, state: &PipelineState) -> graph_core::Result<NodeResult> {
        let creates: Vec<&FileChange> = state
            .accumulated_changes
            .iter()
            .filter(|change| change.is_create())
            .collect();

        let draft = match creates.as_slice() {
            [] => {
                return Ok(NodeResult::failure(
                    "No draft creation detected among accumulated changes",
                ))
            }
            [single] => *single,
            _ => {
                return Ok(NodeResult::failure(
                    "Multiple draft files detected; expected a single draft",
                ))
            }
        };

        let content = draft.content().unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(NodeResult::failure("Draft content is empty"));
        }

        let file_name = draft
            .path()
            .rsplit('/')
            .next()
            .unwrap_or(draft.path())
            .to_string();

        let branch = match self
            .gateway
            .create_draft_branch(vec![DraftFile {
                file_name,
                content: content.to_string(),
            }])
            .await
        {
            Ok(branch) => branch,
            Err(err) => {
                return Ok(NodeResult::failure(format!(
                    "Failed to submit draft branch: {}",
                    err
                )))
            }
        };

        if branch.trim().is_empty() {
            return Ok(NodeResult::failure(
                "Draft service returned an empty branch name",
            ));
        }

        info!(branch = %branch, "Draft branch created");
        Ok(
            NodeResult::ok(format!("Draft branch created: {}", branch))
                .with_metadata("branch_name", json!(branch))
                .with_metadata("draft_file", json!(draft.path())),
        )
    }
}
