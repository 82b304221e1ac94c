//! Reflection Controller
//!
//! Runs the answering agent, scores each answer and either accepts it,
//! retries with a corrective prompt, or stops with a best-effort answer once
//! the retry budget is spent.
//!
//! ```text
//!  Generating ──► Evaluating ──► Accepted
//!       ▲             │
//!       └── retry ────┤
//!                     └────────► Exhausted
//! ```
//!
//! At most `max_reflections + 1` generation calls are made. Failures from the
//! agent or the evaluator are returned as-is; only low quality is retried.

use super::judge::{AnswerEvaluator, EvaluationResult};
use super::prompt::reflection_prompt;
use super::tools::AgentDeps;
use super::AnswerAgent;
use crate::types::AppResult;
use tracing::{info, warn};

/// Marker in the judge's reason that forces a retry regardless of score.
const AMBIGUITY_MARKER: &str = "ambiguous";

/// Bounds of one reflection run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectionPolicy {
    pub reflection_threshold: f64,
    pub max_reflections: u32,
}

impl Default for ReflectionPolicy {
    fn default() -> Self {
        Self {
            reflection_threshold: 0.8,
            max_reflections: 2,
        }
    }
}

/// Whether an evaluated answer can be returned to the user.
pub fn is_acceptable(evaluation: &EvaluationResult, threshold: f64) -> bool {
    let confident = evaluation.llm_judge_score >= threshold;
    let ambiguous = evaluation
        .llm_judge_reason
        .to_lowercase()
        .contains(AMBIGUITY_MARKER);
    confident && !ambiguous
}

#[derive(Debug)]
enum ReflectionState {
    Generating { prompt: String },
    Evaluating { answer: String },
    Accepted {
        answer: String,
        evaluation: EvaluationResult,
    },
    Exhausted {
        answer: String,
        evaluation: EvaluationResult,
    },
}

/// Result of a reflection run
#[derive(Debug, Clone)]
pub struct ReflectionOutcome {
    pub answer: String,
    /// Generation calls made, initial one included
    pub generations: u32,
    /// Judge calls made
    pub evaluations: u32,
    pub accepted: bool,
    pub last_evaluation: EvaluationResult,
}

pub struct ReflectionController<'a> {
    agent: &'a dyn AnswerAgent,
    deps: &'a AgentDeps,
    evaluator: &'a dyn AnswerEvaluator,
    policy: ReflectionPolicy,
}

impl<'a> ReflectionController<'a> {
    pub fn new(
        agent: &'a dyn AnswerAgent,
        deps: &'a AgentDeps,
        evaluator: &'a dyn AnswerEvaluator,
        policy: ReflectionPolicy,
    ) -> Self {
        Self {
            agent,
            deps,
            evaluator,
            policy,
        }
    }

    pub async fn run(&self, question: &str, prompt: &str) -> AppResult<ReflectionOutcome> {
        let mut attempt: u32 = 0;
        let mut generations: u32 = 0;
        let mut evaluations: u32 = 0;
        let mut state = ReflectionState::Generating {
            prompt: prompt.to_string(),
        };

        loop {
            state = match state {
                ReflectionState::Generating { prompt } => {
                    let output = self.agent.run(&prompt, self.deps).await?;
                    generations += 1;
                    ReflectionState::Evaluating {
                        answer: output.output,
                    }
                }
                ReflectionState::Evaluating { answer } => {
                    let evaluation = self.evaluator.compute_metrics(question, &answer).await?;
                    evaluations += 1;
                    info!(
                        attempt,
                        score = evaluation.llm_judge_score,
                        reason = %evaluation.llm_judge_reason,
                        "[metrics] {}",
                        evaluation
                    );

                    if is_acceptable(&evaluation, self.policy.reflection_threshold) {
                        ReflectionState::Accepted { answer, evaluation }
                    } else if attempt >= self.policy.max_reflections {
                        warn!(
                            attempt,
                            "[reflection] Max reflection attempts reached. Returning best-effort answer."
                        );
                        ReflectionState::Exhausted { answer, evaluation }
                    } else {
                        info!(
                            attempt,
                            "[reflection] Low confidence or ambiguity detected. Attempting self-correction..."
                        );
                        attempt += 1;
                        ReflectionState::Generating {
                            prompt: reflection_prompt(&answer),
                        }
                    }
                }
                ReflectionState::Accepted { answer, evaluation } => {
                    return Ok(ReflectionOutcome {
                        answer,
                        generations,
                        evaluations,
                        accepted: true,
                        last_evaluation: evaluation,
                    });
                }
                ReflectionState::Exhausted { answer, evaluation } => {
                    return Ok(ReflectionOutcome {
                        answer,
                        generations,
                        evaluations,
                        accepted: false,
                        last_evaluation: evaluation,
                    });
                }
            };
        }
    }
}
