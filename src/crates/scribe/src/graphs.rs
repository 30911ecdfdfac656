//! Workflow-type catalog.
//!
//! Maps workflow type names to their node graphs at startup. Resolution
//! happens before any durable write, so an unknown type never creates a
//! record. Adding a workflow type means registering one more graph here;
//! the executor is untouched.

use std::collections::HashMap;
use std::sync::Arc;

use clients::{DraftBranchClient, LlmClient, ResearchClient};
use graph_core::{GraphPlan, NodeRegistry, PipelineExecutor};

use crate::error::{Result, ScribeError};
use crate::nodes::{DeepResearchNode, SubmitDraftBranchNode, TopicProposalNode};

/// Workflow type producing a research-article draft branch.
pub const ARTICLE_PROPOSAL: &str = "article-proposal";

/// Default strategy tag for the article-proposal plan.
pub const RESEARCH_PROPOSAL_STRATEGY: &str = "research_proposal";

/// One workflow type's plan together with its executor.
pub struct WorkflowGraph {
    pub plan: GraphPlan,
    pub executor: PipelineExecutor,
}

impl std::fmt::Debug for WorkflowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

/// Catalog of workflow graphs keyed by type name.
#[derive(Default)]
pub struct GraphCatalog {
    graphs: HashMap<String, Arc<WorkflowGraph>>,
}

impl GraphCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard catalog containing the article-proposal graph.
    pub fn with_article_proposal(
        llm: Arc<dyn LlmClient>,
        research: Arc<dyn ResearchClient>,
        draft: Arc<dyn DraftBranchClient>,
    ) -> Self {
        let mut catalog = Self::new();
        catalog.register(ARTICLE_PROPOSAL, article_proposal_graph(llm, research, draft));
        catalog
    }

    /// Register a graph under a workflow type name.
    pub fn register(&mut self, workflow_type: impl Into<String>, graph: WorkflowGraph) {
        self.graphs.insert(workflow_type.into(), Arc::new(graph));
    }

    /// Resolve a workflow type to its graph.
    pub fn resolve(&self, workflow_type: &str) -> Result<Arc<WorkflowGraph>> {
        self.graphs.get(workflow_type).cloned().ok_or_else(|| {
            let mut available: Vec<&str> = self.graphs.keys().map(String::as_str).collect();
            available.sort_unstable();
            ScribeError::UnknownWorkflowType {
                requested: workflow_type.to_string(),
                available: available.join(", "),
            }
        })
    }
}

/// Build the article-proposal graph: topic proposal, deep research, draft
/// submission, in that order.
pub fn article_proposal_graph(
    llm: Arc<dyn LlmClient>,
    research: Arc<dyn ResearchClient>,
    draft: Arc<dyn DraftBranchClient>,
) -> WorkflowGraph {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(TopicProposalNode::new(llm)));
    registry.register(Arc::new(DeepResearchNode::new(research)));
    registry.register(Arc::new(SubmitDraftBranchNode::new(draft)));

    let plan = GraphPlan::new(
        vec![
            "topic_proposal".to_string(),
            "deep_research".to_string(),
            "submit_draft_branch".to_string(),
        ],
        RESEARCH_PROPOSAL_STRATEGY,
    );

    WorkflowGraph {
        plan,
        executor: PipelineExecutor::new(registry),
    }
}
