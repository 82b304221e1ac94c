use async_trait::async_trait;
use crate::types::{AppError, AppResult, LLMProvider, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Configuration for an LLM provider
pub struct LLMProviderConfig {
    pub name: String,
    pub api_key: String,
    /// Overrides the provider's default endpoint; required for `custom`
    pub base_url: Option<String>,
}

impl LLMProviderConfig {
    pub fn from_config(config: &crate::config::LLMConfig) -> Self {
        Self {
            name: config.provider.clone(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    provider_name: String,
}

impl LLM {
    pub fn new(provider: LLMProviderConfig) -> AppResult<Self> {
        let kind = LLMProvider::parse(&provider.name).ok_or_else(|| {
            AppError::InvalidConfiguration(format!("Unsupported provider: {}", provider.name))
        })?;

        // Every supported provider exposes an OpenAI-compatible chat endpoint
        let base_url = provider
            .base_url
            .or_else(|| kind.default_base_url().map(String::from))
            .ok_or_else(|| {
                AppError::InvalidConfiguration(format!(
                    "Provider '{}' requires LLM_BASE_URL to be set",
                    provider.name
                ))
            })?;

        let adapter: Box<dyn LLMAdapter> = Box::new(
            crate::llm::openai::OpenAIAdapter::with_base_url(&provider.api_key, &base_url),
        );

        Ok(Self {
            adapter,
            provider_name: kind.to_string(),
        })
    }

    /// Wrap an already constructed adapter
    pub fn from_adapter(name: impl Into<String>, adapter: Box<dyn LLMAdapter>) -> Self {
        Self {
            adapter,
            provider_name: name.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }
}
