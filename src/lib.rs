// Reflective RAG - retrieval-augmented answering with a self-reflection loop

pub mod config;
pub mod types;
pub mod agents;
pub mod llm;
pub mod search;    // Web search fallback (SerpAPI)
pub mod embeddings;
pub mod runner;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use runner::{AgentRunner, AnswerOptions};
pub use types::{AppError, AppResult, ConversationTurn};
