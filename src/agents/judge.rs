//! Answer Evaluator
//!
//! Scores a (question, answer) pair. The reflection loop only depends on the
//! `AnswerEvaluator` trait; `LlmJudge` is the default, an LLM-as-judge.

use crate::llm::provider::{LLMProviderConfig, LLM};
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};
use crate::utils::extract_json_block;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const JUDGE_SYSTEM_INSTRUCTION: &str =
    "You are a strict grader of question-answering systems. Respond only with JSON.";

/// Quality judgment for one answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub llm_judge_score: f64,
    pub llm_judge_reason: String,
}

impl EvaluationResult {
    pub fn new(score: f64, reason: impl Into<String>) -> Self {
        Self {
            llm_judge_score: score,
            llm_judge_reason: reason.into(),
        }
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "score={:.2} reason={:?}", self.llm_judge_score, self.llm_judge_reason)
    }
}

#[async_trait]
pub trait AnswerEvaluator: Send + Sync {
    async fn compute_metrics(&self, question: &str, answer: &str) -> AppResult<EvaluationResult>;
}

#[derive(Debug, Deserialize)]
struct JudgeVerdict {
    score: f64,
    #[serde(default)]
    reason: String,
}

pub struct LlmJudge {
    llm: LLM,
    model: String,
}

impl LlmJudge {
    pub fn new(llm: LLM, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    pub fn from_config(config: &crate::config::Config) -> AppResult<Self> {
        let llm = LLM::new(LLMProviderConfig::from_config(&config.llm))?;
        Ok(Self::new(llm, config.llm.judge_model.clone()))
    }

    fn create_judge_prompt(question: &str, answer: &str) -> String {
        format!(r#"Evaluate how well the ANSWER responds to the QUESTION.

QUESTION:
{question}

ANSWER:
{answer}

Score from 0.0 (useless, wrong or empty) to 1.0 (accurate, complete, clear).
If the answer is vague or could be read several ways, say "ambiguous" in the reason.

OUTPUT FORMAT (respond with ONLY valid JSON):
{{"score": 0.0, "reason": "one sentence explaining the score"}}"#,
            question = question,
            answer = answer
        )
    }

    fn parse_verdict(response: &str) -> AppResult<EvaluationResult> {
        let verdict: JudgeVerdict = serde_json::from_str(extract_json_block(response))
            .map_err(|e| AppError::Evaluation(format!("Failed to parse judge verdict: {}", e)))?;

        if !verdict.score.is_finite() {
            return Err(AppError::Evaluation("Judge returned a non-finite score".to_string()));
        }

        Ok(EvaluationResult::new(verdict.score.clamp(0.0, 1.0), verdict.reason))
    }
}

#[async_trait]
impl AnswerEvaluator for LlmJudge {
    async fn compute_metrics(&self, question: &str, answer: &str) -> AppResult<EvaluationResult> {
        let request = LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::user(Self::create_judge_prompt(question, answer))],
            max_tokens: Some(256),
            temperature: Some(0.0),
            system_instruction: Some(JUDGE_SYSTEM_INSTRUCTION.to_string()),
        };

        let response = self.llm.create_chat_completion(&request).await?;
        debug!(response_len = response.content.len(), "Received judge verdict");
        Self::parse_verdict(&response.content)
    }
}
