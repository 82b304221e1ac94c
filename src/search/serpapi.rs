//! SerpAPI Client
//!
//! Quick general web search through SerpAPI's `google_light` engine. Results
//! are reduced to title, snippet, link and source domain, which is all the
//! answering agent needs to ground a reply.

use serpapi_search_rust::serp_api_search::SerpApiSearch;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("SerpAPI key not configured")]
    NoApiKey,

    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse search results: {0}")]
    ParseError(String),

    #[error("No results found for query")]
    NoResults,
}

impl From<SearchError> for crate::types::AppError {
    fn from(err: SearchError) -> Self {
        crate::types::AppError::Search(err.to_string())
    }
}

/// Result from a web search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    /// Title of the result
    pub title: String,
    /// Snippet/description
    pub snippet: String,
    /// URL link
    pub link: String,
    /// Source domain
    pub source: Option<String>,
}

/// SerpAPI client for general web search
pub struct SerpApiClient {
    api_key: String,
    max_results: usize,
}

impl SerpApiClient {
    /// Create a new SerpAPI client
    pub fn new(api_key: String) -> Result<Self, SearchError> {
        if api_key.is_empty() {
            return Err(SearchError::NoApiKey);
        }
        Ok(Self {
            api_key,
            max_results: 10,
        })
    }

    /// Configure client from config; `None` when no key is set
    pub fn from_config(config: &crate::config::SearchConfig) -> Option<Self> {
        Self::new(config.serpapi_key.clone())
            .ok()
            .map(|client| client.with_max_results(config.max_results))
    }

    /// Set maximum results per search
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max.max(1);
        self
    }

    /// Search the web for quick results
    pub async fn search_web(&self, query: &str) -> Result<Vec<WebResult>, SearchError> {
        info!(query = %query, "Searching the web via SerpAPI");

        let mut params = HashMap::<String, String>::new();
        params.insert("engine".to_string(), "google_light".to_string());
        params.insert("q".to_string(), query.to_string());
        params.insert("hl".to_string(), "en".to_string());
        params.insert("gl".to_string(), "us".to_string());
        params.insert("num".to_string(), self.max_results.to_string());

        let search = SerpApiSearch::google(params, self.api_key.clone());

        let results = search
            .json()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        debug!("Raw web search response received");

        let web_results = parse_organic_results(&results, self.max_results)?;
        info!(count = web_results.len(), "Web search completed");
        Ok(web_results)
    }
}

/// Turn SerpAPI's `organic_results` array into `WebResult`s.
fn parse_organic_results(
    results: &Value,
    max_results: usize,
) -> Result<Vec<WebResult>, SearchError> {
    let organic_results = results
        .get("organic_results")
        .ok_or(SearchError::NoResults)?;

    let results_array = organic_results
        .as_array()
        .ok_or_else(|| SearchError::ParseError("Expected array of results".to_string()))?;

    if results_array.is_empty() {
        return Err(SearchError::NoResults);
    }

    let web_results = results_array
        .iter()
        .take(max_results)
        .map(|result| {
            let title = result
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("Untitled")
                .to_string();

            let snippet = result
                .get("snippet")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let link = result
                .get("link")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let source = result
                .get("source")
                .and_then(|v| v.as_str())
                .map(String::from)
                .or_else(|| {
                    // Extract domain from link
                    link.split('/').nth(2).filter(|d| !d.is_empty()).map(String::from)
                });

            WebResult {
                title,
                snippet,
                link,
                source,
            }
        })
        .collect();

    Ok(web_results)
}
