//! Topic-proposal node.
//!
//! First stage of the article-proposal pipeline: renders the research-topic
//! prompt, invokes the LLM, and parses a single topic proposal out of the
//! response. The primary prompt containing the phrase "fail intentionally"
//! triggers a deliberate failure; the phrase is part of the node contract
//! and exercised by the end-to-end suite.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use clients::{ChatMessage, LlmClient};
use graph_core::{Node, NodeResult, PipelineState};

use super::prompts;

/// Phrase in the primary prompt that triggers the deliberate failure hook.
const FAILURE_PHRASE: &str = "fail intentionally";

/// Node proposing a research topic from the user's prompt.
pub struct TopicProposalNode {
    llm: Arc<dyn LlmClient>,
}

impl TopicProposalNode {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[derive(Debug, Deserialize)]
struct TopicProposal {
    title: String,
    summary: String,
    tags: Vec<String>,
    slug: String,
}

#[async_trait]
impl Node for TopicProposalNode {
    fn name(&self) -> &str {
        "topic_proposal"
    }

    fn validate(&self, state: &PipelineState) -> bool {
        state
            .primary_prompt()
            .is_some_and(|prompt| !prompt.trim().is_empty())
    }

    async fn execute(&self, state: &PipelineState) -> graph_core::Result<NodeResult> {
        let prompt = state.primary_prompt().unwrap_or_default().trim().to_string();

        if prompt.to_lowercase().contains(FAILURE_PHRASE) {
            return Ok(NodeResult::failure(
                "Intentional failure requested by prompt",
            ));
        }

        let rendered = prompts::research_topic(&prompt);
        let response = match self.llm.invoke(vec![ChatMessage::user(rendered)]).await {
            Ok(response) => response,
            Err(err) => {
                return Ok(NodeResult::failure(format!(
                    "Failed to generate research topic: {}",
                    err
                )))
            }
        };

        let Some(topic) = parse_topic_proposal(&response) else {
            return Ok(NodeResult::failure(
                "Failed to parse LLM response: malformed JSON",
            ));
        };

        debug!(title = %topic.title, "Parsed topic proposal");
        Ok(
            NodeResult::ok(format!("Generated research topic: {}", topic.title))
                .with_metadata("topic_title", json!(topic.title))
                .with_metadata("topic_summary", json!(topic.summary))
                .with_metadata("topic_tags", json!(topic.tags))
                .with_metadata("proposal_slug", json!(topic.slug)),
        )
    }
}

/// Extract the topic proposal object between the first `{` and the last `}`
/// of the response; models often wrap JSON in prose.
fn parse_topic_proposal(response: &str) -> Option<TopicProposal> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }

    let proposal: TopicProposal = serde_json::from_str(&response[start..=end]).ok()?;
    if proposal.title.trim().is_empty() || proposal.slug.trim().is_empty() {
        return None;
    }
    Some(proposal)
}
