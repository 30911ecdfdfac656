//! Deep-research service client.
//!
//! The research service accepts a topic and returns a complete markdown
//! article with source metadata. The client validates the payload shape
//! before handing it to the deep-research node; a `success: false` report is
//! returned to the node rather than raised, so the node can surface the
//! service's own error message.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Outcome of one research request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    /// Whether the service produced an article.
    pub success: bool,
    /// Generated markdown article when successful.
    pub article: Option<String>,
    /// Source metadata (`source_count` among others).
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Diagnostic lines emitted by the service.
    #[serde(default)]
    pub diagnostics: Vec<String>,
    /// Server-side processing time in seconds.
    pub processing_time: Option<f64>,
    /// Error description when `success` is false.
    pub error_message: Option<String>,
}

impl ResearchReport {
    /// Number of sources the service consulted, when reported.
    pub fn source_count(&self) -> u64 {
        self.metadata
            .get("source_count")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

/// Deep-research service client.
#[async_trait]
pub trait ResearchClient: Send + Sync {
    /// Run research for a topic title.
    async fn research(&self, topic: &str) -> Result<ResearchReport>;
}

/// HTTP client for the research service.
#[derive(Clone)]
pub struct ResearchApiClient {
    base_url: String,
    client: Client,
}

impl ResearchApiClient {
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
struct ResearchRequest<'a> {
    query: &'a str,
}

#[async_trait]
impl ResearchClient for ResearchApiClient {
    async fn research(&self, topic: &str) -> Result<ResearchReport> {
        let url = format!("{}/research", self.base_url);
        debug!(url = %url, topic = %topic, "Requesting research");

        let response = self
            .client
            .post(&url)
            .json(&ResearchRequest { query: topic })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Api(format!(
                "research endpoint returned status {}",
                response.status()
            )));
        }

        let report: ResearchReport = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("malformed research payload: {}", e)))?;

        if report.success {
            match &report.article {
                Some(article) if !article.trim().is_empty() => {}
                _ => {
                    return Err(ClientError::InvalidResponse(
                        "research response missing article content".to_string(),
                    ));
                }
            }
        } else {
            warn!(
                error = report.error_message.as_deref().unwrap_or("unspecified"),
                "Research service reported failure"
            );
        }

        Ok(report)
    }
}

/// Mock research client returning deterministic articles.
#[derive(Debug, Clone, Default)]
pub struct MockResearchClient {
    failure: Option<String>,
    article: Option<String>,
}

impl MockResearchClient {
    /// Mock that always succeeds with a generated article.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that always succeeds with the given article body.
    pub fn with_article(article: impl Into<String>) -> Self {
        Self {
            failure: None,
            article: Some(article.into()),
        }
    }

    /// Mock that always fails with the given error message.
    pub fn failing(error_message: impl Into<String>) -> Self {
        Self {
            failure: Some(error_message.into()),
            article: None,
        }
    }
}

#[async_trait]
impl ResearchClient for MockResearchClient {
    async fn research(&self, topic: &str) -> Result<ResearchReport> {
        if let Some(error_message) = &self.failure {
            return Ok(ResearchReport {
                success: false,
                article: None,
                metadata: HashMap::new(),
                diagnostics: Vec::new(),
                processing_time: None,
                error_message: Some(error_message.clone()),
            });
        }

        let article = self.article.clone().unwrap_or_else(|| {
            format!(
                "# {}\n\nComprehensive analysis covering key aspects, findings, \
                 and recommendations based on available information.\n",
                topic
            )
        });

        let mut metadata = HashMap::new();
        metadata.insert("source_count".to_string(), Value::from(3));

        Ok(ResearchReport {
            success: true,
            article: Some(article),
            metadata,
            diagnostics: vec!["mock research client".to_string()],
            processing_time: Some(0.01),
            error_message: None,
        })
    }
}
