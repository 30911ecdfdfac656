//! Deep-research node.
//!
//! Second stage: hands the proposed topic to the research service and turns
//! the returned markdown article into a single `Create` change under
//! `proposals/`, named `<slug>-<UTC timestamp>.md`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::info;

use clients::ResearchClient;
use graph_core::{FileChange, Node, NodeResult, PipelineState};

use super::slugify;

/// Node delegating research and persisting the returned article.
pub struct DeepResearchNode {
    research: Arc<dyn ResearchClient>,
}

impl DeepResearchNode {
    pub fn new(research: Arc<dyn ResearchClient>) -> Self {
        Self { research }
    }
}

#[async_trait]
impl Node for DeepResearchNode {
    fn name(&self) -> &str {
        "deep_research"
    }

    fn validate(&self, state: &PipelineState) -> bool {
        state
            .metadata_str("topic_title")
            .is_some_and(|title| !title.trim().is_empty())
    }

    async fn execute(&self, state: &PipelineState) -> graph_core::Result<NodeResult> {
        let topic = state
            .metadata_str("topic_title")
            .unwrap_or_default()
            .to_string();

        info!(topic = %topic, "Starting research");
        let report = match self.research.research(&topic).await {
            Ok(report) => report,
            Err(err) => {
                return Ok(NodeResult::failure(format!(
                    "Failed to conduct research: {}",
                    err
                )))
            }
        };

        if !report.success {
            let reason = report
                .error_message
                .unwrap_or_else(|| "research service reported failure".to_string());
            return Ok(NodeResult::failure(format!(
                "Failed to conduct research: {}",
                reason
            )));
        }

        let article = report.article.clone().unwrap_or_default();
        if article.trim().is_empty() {
            return Ok(NodeResult::failure(
                "Research response missing article content",
            ));
        }

        // Prefer the slug proposed upstream; either way normalize it so the
        // file name stays within the slug shape.
        let slug = state
            .metadata_str("proposal_slug")
            .filter(|slug| !slug.trim().is_empty())
            .map(slugify)
            .unwrap_or_else(|| slugify(&topic));

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{}-{}.md", slug, timestamp);
        let path = format!("proposals/{}", filename);
        let change = FileChange::create(&path, article.trim())?;

        let mut result = NodeResult::ok(format!("Generated research proposal: {}", filename))
            .with_changes(vec![change])
            .with_metadata("proposal_filename", json!(filename))
            .with_metadata("proposal_path", json!(path))
            .with_metadata("sources_count", json!(report.source_count()));
        if let Some(seconds) = report.processing_time {
            result = result.with_metadata("processing_time_seconds", json!(seconds));
        }
        Ok(result)
    }
}
