//! Agent System
//!
//! Components that turn a question into a checked answer:
//!
//! - **Prompt Builder**: initial retrieval prompt and corrective prompt
//! - **RAG Agent**: answers a prompt using `vector_search` / `web_search`
//! - **Judge**: scores an answer for a question
//! - **Reflection Controller**: retries low-quality answers within a budget
//!
//! ## Pipeline Overview
//!
//! ```text
//! Question + History
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Prompt    │  → Initial instruction prompt
//! │   Builder   │
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐     ┌─────────────┐
//! │ Reflection  │ ──► │  RAG Agent  │  → Answer text
//! │ Controller  │ ◄── │   + Judge   │  → Score and reason
//! └─────────────┘     └─────────────┘
//!      │
//!      ▼
//!  Final Answer
//! ```

pub mod judge;
pub mod prompt;
pub mod rag;
pub mod reflection;
pub mod tools;

pub use judge::{AnswerEvaluator, EvaluationResult, LlmJudge};
pub use prompt::{build_prompt, format_history, reflection_prompt, FALLBACK_ANSWER};
pub use rag::RagAgent;
pub use reflection::{is_acceptable, ReflectionController, ReflectionOutcome, ReflectionPolicy};
pub use tools::{AgentDeps, ContextSearch, ToolCall, WebSearch};

use crate::config::Config;
use crate::embeddings::{DocumentProcessor, VectorIndex};
use crate::llm::provider::{LLMProviderConfig, LLM};
use crate::search::SerpApiClient;
use crate::types::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Text produced by one agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub output: String,
}

impl AgentOutput {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

/// An agent that answers a prompt using the tools in `AgentDeps`.
#[async_trait]
pub trait AnswerAgent: Send + Sync {
    async fn run(&self, prompt: &str, deps: &AgentDeps) -> AppResult<AgentOutput>;
}

/// Build the default agent together with the dependencies it was built for.
pub async fn build_agent(config: &Config) -> AppResult<(Arc<dyn AnswerAgent>, AgentDeps)> {
    if config.llm.active_api_key().is_none() {
        warn!(provider = %config.llm.provider, "No LLM API key configured");
    }
    let llm = LLM::new(LLMProviderConfig::from_config(&config.llm))?;

    let mut index = VectorIndex::from_config(&config.retrieval);
    match &config.retrieval.docs_dir {
        Some(dir) => {
            let documents = DocumentProcessor::load_directory(dir).await?;
            let chunks = index.add_documents(&documents);
            info!(documents = documents.len(), chunks, "Vector index ready");
        }
        None => warn!("DOCS_DIR not set, vector search will return no context"),
    }

    let web: Option<Arc<dyn WebSearch>> = match SerpApiClient::from_config(&config.search) {
        Some(client) => Some(Arc::new(client) as Arc<dyn WebSearch>),
        None => {
            warn!("SERPAPI_API_KEY not set, web search disabled");
            None
        }
    };

    let deps = AgentDeps::new(Arc::new(index), web).with_default_limit(config.reflection.limit);
    let agent: Arc<dyn AnswerAgent> = Arc::new(
        RagAgent::new(llm, config.llm.model.clone())
            .with_max_tool_steps(config.agent.max_tool_steps),
    );

    info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        web_search = deps.web.is_some(),
        "Agent built"
    );

    Ok((agent, deps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn config(pairs: &[(&str, String)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[tokio::test]
    async fn test_build_agent_indexes_docs_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("france.md"),
            "Paris is the capital of France.",
        )
        .unwrap();

        let config = config(&[
            ("LLM_API_KEY", "sk-test".to_string()),
            ("DOCS_DIR", temp_dir.path().display().to_string()),
        ]);

        let (_agent, deps) = build_agent(&config).await.unwrap();

        assert!(deps.web.is_none());
        assert_eq!(deps.default_limit, 5);
        let hits = deps.context.vector_search("capital of France", 3).await.unwrap();
        assert_eq!(hits[0].source, "france.md");
    }

    #[tokio::test]
    async fn test_build_agent_rejects_unknown_provider() {
        let config = config(&[("LLM_PROVIDER", "carrier-pigeon".to_string())]);
        assert!(build_agent(&config).await.is_err());
    }
}
