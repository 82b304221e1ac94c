use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub retrieval: RetrievalConfig,
    pub agent: AgentConfig,
    pub reflection: ReflectionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub judge_model: String,
}

impl LLMConfig {
    pub fn active_api_key(&self) -> Option<String> {
        if self.api_key.is_empty() {
            None
        } else {
            Some(self.api_key.clone())
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub serpapi_key: String,
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub docs_dir: Option<PathBuf>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_dimensions: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub max_tool_steps: usize,
}

/// Defaults for a single `answer` call
#[derive(Debug, Clone, Deserialize)]
pub struct ReflectionConfig {
    pub limit: usize,
    pub threshold: f64,
    pub max_reflections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let model = var("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        let config = Self {
            llm: LLMConfig {
                provider: var("LLM_PROVIDER").unwrap_or_else(|| "openai".to_string()),
                judge_model: var("JUDGE_LLM_MODEL").unwrap_or_else(|| model.clone()),
                model,
                api_key: var("LLM_API_KEY")
                    .or_else(|| var("OPENAI_API_KEY"))
                    .unwrap_or_default(),
                base_url: var("LLM_BASE_URL"),
            },
            search: SearchConfig {
                serpapi_key: var("SERPAPI_API_KEY").unwrap_or_default(),
                max_results: parse_or(&var, "WEB_SEARCH_MAX_RESULTS", 5)?,
            },
            retrieval: RetrievalConfig {
                docs_dir: var("DOCS_DIR").map(PathBuf::from),
                chunk_size: parse_or(&var, "CHUNK_SIZE", 800)?,
                chunk_overlap: parse_or(&var, "CHUNK_OVERLAP", 100)?,
                embedding_dimensions: parse_or(&var, "EMBEDDING_DIMENSIONS", 384)?,
            },
            agent: AgentConfig {
                max_tool_steps: parse_or(&var, "AGENT_MAX_TOOL_STEPS", 4)?,
            },
            reflection: ReflectionConfig {
                limit: parse_or(&var, "RETRIEVAL_LIMIT", 5)?,
                threshold: parse_or(&var, "REFLECTION_THRESHOLD", 0.8)?,
                max_reflections: parse_or(&var, "MAX_REFLECTIONS", 2)?,
            },
            logging: LoggingConfig {
                log_dir: var("LOG_DIR").map(PathBuf::from),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.reflection.threshold) {
            bail!(
                "REFLECTION_THRESHOLD must be between 0 and 1, got {}",
                self.reflection.threshold
            );
        }
        if self.reflection.limit == 0 {
            bail!("RETRIEVAL_LIMIT must be at least 1");
        }
        if self.retrieval.chunk_size == 0
            || self.retrieval.chunk_overlap >= self.retrieval.chunk_size
        {
            bail!(
                "CHUNK_OVERLAP ({}) must be smaller than a non-zero CHUNK_SIZE ({})",
                self.retrieval.chunk_overlap,
                self.retrieval.chunk_size
            );
        }
        if self.retrieval.embedding_dimensions == 0 {
            bail!("EMBEDDING_DIMENSIONS must be at least 1");
        }
        Ok(())
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
