//! RAG Agent
//!
//! Default answering agent. It drives the LLM through a small JSON tool
//! protocol: each reply is either a tool call
//! (`{"tool": "vector_search", "query": .., "limit": ..}` or
//! `{"tool": "web_search", "query": ..}`) or a final `{"answer": ..}`.
//! Replies that are not JSON are taken as the answer.
//!
//! Every `run` starts from an empty transcript.

use super::prompt::FALLBACK_ANSWER;
use super::tools::{AgentDeps, ToolCall};
use super::{AgentOutput, AnswerAgent};
use crate::llm::provider::LLM;
use crate::types::{AppResult, LLMMessage, LLMRequest};
use crate::utils::extract_json_block;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

const SYSTEM_INSTRUCTION: &str = r#"You are a retrieval-augmented assistant. You can use two tools.

To call a tool, reply with ONLY one JSON object:
{"tool": "vector_search", "query": "<search text>", "limit": <number of passages>}
{"tool": "web_search", "query": "<search text>"}

Tool results are sent back to you in the next message.
When you are ready to answer, reply with ONLY:
{"answer": "<your final answer>"}"#;

#[derive(Deserialize)]
#[serde(untagged)]
enum AgentReply {
    Tool(ToolCall),
    Answer { answer: String },
}

#[derive(Debug, PartialEq)]
enum AgentStep {
    Call(ToolCall),
    Answer(String),
}

pub struct RagAgent {
    llm: LLM,
    model: String,
    max_tool_steps: usize,
    temperature: f32,
}

impl RagAgent {
    pub fn new(llm: LLM, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            max_tool_steps: 4,
            temperature: 0.2,
        }
    }

    pub fn with_max_tool_steps(mut self, steps: usize) -> Self {
        self.max_tool_steps = steps;
        self
    }

    fn parse_reply(content: &str) -> AgentStep {
        match serde_json::from_str::<AgentReply>(extract_json_block(content)) {
            Ok(AgentReply::Tool(call)) => AgentStep::Call(call),
            Ok(AgentReply::Answer { answer }) => AgentStep::Answer(answer),
            Err(_) => AgentStep::Answer(content.trim().to_string()),
        }
    }

    async fn complete(&self, messages: &[LLMMessage]) -> AppResult<String> {
        let request = LLMRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            max_tokens: Some(1024),
            temperature: Some(self.temperature),
            system_instruction: Some(SYSTEM_INSTRUCTION.to_string()),
        };
        let response = self.llm.create_chat_completion(&request).await?;
        Ok(response.content)
    }
}

#[async_trait]
impl AnswerAgent for RagAgent {
    async fn run(&self, prompt: &str, deps: &AgentDeps) -> AppResult<AgentOutput> {
        let mut messages = vec![LLMMessage::user(prompt)];

        for step in 0..self.max_tool_steps {
            let content = self.complete(&messages).await?;

            let call = match Self::parse_reply(&content) {
                AgentStep::Answer(answer) => {
                    info!(step, answer_len = answer.len(), "Agent produced an answer");
                    return Ok(AgentOutput::new(answer));
                }
                AgentStep::Call(call) => call,
            };

            debug!(step, tool = call.name(), "Agent requested a tool");
            let observation = match call.execute(deps).await {
                Ok(observation) => observation,
                Err(e) => {
                    warn!(tool = call.name(), error = %e, "Tool call failed");
                    format!("{} failed: {}", call.name(), e)
                }
            };

            messages.push(LLMMessage::assistant(content));
            messages.push(LLMMessage::user(format!(
                "Result of {}:\n{}",
                call.name(),
                observation
            )));
        }

        messages.push(LLMMessage::user(
            "No more tool calls are allowed. Reply now with {\"answer\": \"...\"} using only the results above.",
        ));
        let content = self.complete(&messages).await?;

        match Self::parse_reply(&content) {
            AgentStep::Answer(answer) => Ok(AgentOutput::new(answer)),
            AgentStep::Call(call) => {
                warn!(tool = call.name(), "Agent kept calling tools after the budget was spent");
                Ok(AgentOutput::new(FALLBACK_ANSWER))
            }
        }
    }
}
