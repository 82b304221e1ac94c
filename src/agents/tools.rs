//! Retrieval tools available to the answering agent
//!
//! The agent sees two tools: `vector_search` over the local knowledge base
//! and `web_search` as a fallback. Both are reached through traits so the
//! agent can be exercised without a network.

use crate::embeddings::{SearchResult, VectorIndex};
use crate::search::{SerpApiClient, WebResult};
use crate::types::AppResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

#[async_trait]
pub trait ContextSearch: Send + Sync {
    async fn vector_search(&self, query: &str, limit: usize) -> AppResult<Vec<SearchResult>>;
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn web_search(&self, query: &str) -> AppResult<Vec<WebResult>>;
}

#[async_trait]
impl ContextSearch for VectorIndex {
    async fn vector_search(&self, query: &str, limit: usize) -> AppResult<Vec<SearchResult>> {
        Ok(self.search(query, limit))
    }
}

#[async_trait]
impl WebSearch for SerpApiClient {
    async fn web_search(&self, query: &str) -> AppResult<Vec<WebResult>> {
        Ok(self.search_web(query).await?)
    }
}

/// Everything the agent needs besides the prompt
#[derive(Clone)]
pub struct AgentDeps {
    pub context: Arc<dyn ContextSearch>,
    /// `None` when no web search backend is configured
    pub web: Option<Arc<dyn WebSearch>>,
    /// Used when the model asks for `vector_search` without a limit
    pub default_limit: usize,
}

impl AgentDeps {
    pub fn new(context: Arc<dyn ContextSearch>, web: Option<Arc<dyn WebSearch>>) -> Self {
        Self {
            context,
            web,
            default_limit: 5,
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }
}

impl std::fmt::Debug for AgentDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDeps")
            .field("web_search", &self.web.is_some())
            .field("default_limit", &self.default_limit)
            .finish()
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    VectorSearch {
        query: String,
        #[serde(default)]
        limit: Option<usize>,
    },
    WebSearch {
        query: String,
    },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::VectorSearch { .. } => "vector_search",
            ToolCall::WebSearch { .. } => "web_search",
        }
    }

    /// Run the tool and render its output as an observation for the model.
    pub async fn execute(&self, deps: &AgentDeps) -> AppResult<String> {
        match self {
            ToolCall::VectorSearch { query, limit } => {
                let limit = limit.unwrap_or(deps.default_limit).max(1);
                let hits = deps.context.vector_search(query, limit).await?;
                Ok(format_context_hits(&hits))
            }
            ToolCall::WebSearch { query } => match &deps.web {
                Some(web) => {
                    let results = web.web_search(query).await?;
                    Ok(format_web_results(&results))
                }
                None => Ok("web_search is not available.".to_string()),
            },
        }
    }
}

pub fn format_context_hits(hits: &[SearchResult]) -> String {
    if hits.is_empty() {
        return "No matching context found.".to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] ({}, score {:.2}) {}",
                i + 1,
                hit.source,
                hit.score,
                hit.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_web_results(results: &[WebResult]) -> String {
    if results.is_empty() {
        return "No web results found.".to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] {} - {} ({})", i + 1, r.title, r.snippet, r.link))
        .collect::<Vec<_>>()
        .join("\n")
}
