//! External service clients consumed by the scribe workflow nodes.
//!
//! Each collaborator crossing the core boundary is a narrow trait with an
//! HTTP implementation and a mock:
//!
//! - [`LlmClient`] — chat completion used for topic proposals
//! - [`ResearchClient`] — deep-research service returning markdown articles
//! - [`DraftBranchClient`] — draft gateway turning files into remote branches
//!
//! The mocks mirror the shape of the real services and are selected through
//! runtime configuration for offline development and tests. Clients are
//! stateless from the caller's perspective; connection pooling is internal
//! to each adapter.

pub mod draft;
pub mod error;
pub mod llm;
pub mod research;

pub use draft::{DraftBranchClient, DraftFile, DraftGatewayClient, MockDraftClient};
pub use error::{ClientError, Result};
pub use llm::{ChatMessage, LlmClient, MockLlmClient, OllamaClient};
pub use research::{MockResearchClient, ResearchApiClient, ResearchClient, ResearchReport};
