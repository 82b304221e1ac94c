//! Agent Runner
//!
//! Public entry point: builds the prompt for a question and hands it to the
//! reflection loop. Holds no per-question state, so one runner can serve
//! concurrent callers.

use crate::agents::{
    build_agent, build_prompt, AgentDeps, AnswerAgent, AnswerEvaluator, ReflectionController,
    ReflectionPolicy,
};
use crate::config::Config;
use crate::types::{AppError, AppResult, ConversationTurn};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// Per-call knobs of `AgentRunner::answer`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerOptions {
    /// Passages requested from `vector_search`
    pub limit: usize,
    /// Minimum judge score for an answer to be accepted
    pub reflection_threshold: f64,
    /// Corrective retries allowed after the first answer
    pub max_reflections: u32,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            reflection_threshold: 0.8,
            max_reflections: 2,
        }
    }
}

impl AnswerOptions {
    pub fn from_config(config: &crate::config::ReflectionConfig) -> Self {
        Self {
            limit: config.limit,
            reflection_threshold: config.threshold,
            max_reflections: config.max_reflections,
        }
    }

    fn policy(&self) -> ReflectionPolicy {
        ReflectionPolicy {
            reflection_threshold: self.reflection_threshold,
            max_reflections: self.max_reflections,
        }
    }
}

pub struct AgentRunner {
    agent: Arc<dyn AnswerAgent>,
    deps: AgentDeps,
    evaluator: Arc<dyn AnswerEvaluator>,
}

impl AgentRunner {
    /// Create a runner, building the default agent from `config` when neither
    /// an agent nor its dependencies are supplied.
    pub async fn new(
        agent: Option<Arc<dyn AnswerAgent>>,
        deps: Option<AgentDeps>,
        evaluator: Arc<dyn AnswerEvaluator>,
        config: &Config,
    ) -> AppResult<Self> {
        Self::with_factory(agent, deps, evaluator, || build_agent(config)).await
    }

    /// Like `new`, with a custom factory for the (agent, deps) pair.
    ///
    /// Supplying exactly one of `agent` and `deps` is a configuration error;
    /// the factory is not called in that case.
    pub async fn with_factory<F, Fut>(
        agent: Option<Arc<dyn AnswerAgent>>,
        deps: Option<AgentDeps>,
        evaluator: Arc<dyn AnswerEvaluator>,
        factory: F,
    ) -> AppResult<Self>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<(Arc<dyn AnswerAgent>, AgentDeps)>>,
    {
        let (agent, deps) = match (agent, deps) {
            (Some(agent), Some(deps)) => (agent, deps),
            (None, None) => factory().await?,
            _ => {
                return Err(AppError::InvalidConfiguration(
                    "Both agent and deps must be provided together.".to_string(),
                ))
            }
        };

        Ok(Self {
            agent,
            deps,
            evaluator,
        })
    }

    /// Answer a question, self-correcting low-quality answers.
    ///
    /// Always returns an answer string unless a collaborator fails; when no
    /// answer is accepted within the budget the last one is returned.
    pub async fn answer(
        &self,
        question: &str,
        conversation_history: Option<&[ConversationTurn]>,
        options: AnswerOptions,
    ) -> AppResult<String> {
        if options.limit == 0 {
            return Err(AppError::InvalidRequest(
                "limit must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&options.reflection_threshold) {
            return Err(AppError::InvalidRequest(format!(
                "reflection_threshold must be between 0.0 and 1.0, got {}",
                options.reflection_threshold
            )));
        }

        let run_id = uuid::Uuid::new_v4();
        self.run_reflection(question, conversation_history, options)
            .instrument(info_span!("answer", %run_id))
            .await
    }

    async fn run_reflection(
        &self,
        question: &str,
        conversation_history: Option<&[ConversationTurn]>,
        options: AnswerOptions,
    ) -> AppResult<String> {
        info!(
            question_len = question.len(),
            history_turns = conversation_history.map_or(0, |h| h.len()),
            limit = options.limit,
            threshold = options.reflection_threshold,
            max_reflections = options.max_reflections,
            "Answering question"
        );

        let prompt = build_prompt(question, conversation_history, options.limit);
        let deps = self.deps.clone().with_default_limit(options.limit);
        let controller = ReflectionController::new(
            self.agent.as_ref(),
            &deps,
            self.evaluator.as_ref(),
            options.policy(),
        );
        let outcome = controller.run(question, &prompt).await?;

        info!(
            generations = outcome.generations,
            accepted = outcome.accepted,
            score = outcome.last_evaluation.llm_judge_score,
            answer_len = outcome.answer.len(),
            "Answer ready"
        );
        Ok(outcome.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentOutput, ContextSearch, EvaluationResult, ToolCall, FALLBACK_ANSWER};
    use crate::embeddings::SearchResult;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Built = AppResult<(Arc<dyn AnswerAgent>, AgentDeps)>;

    struct NoContext;

    #[async_trait]
    impl ContextSearch for NoContext {
        async fn vector_search(&self, _query: &str, _limit: usize) -> AppResult<Vec<SearchResult>> {
            Ok(Vec::new())
        }
    }

    fn deps() -> AgentDeps {
        AgentDeps::new(Arc::new(NoContext), None)
    }

    #[derive(Default)]
    struct RecordingAgent {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AnswerAgent for RecordingAgent {
        async fn run(&self, prompt: &str, _deps: &AgentDeps) -> AppResult<AgentOutput> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            Ok(AgentOutput::new(format!("answer #{}", prompts.len())))
        }
    }

    struct Verdicts(Mutex<VecDeque<(f64, &'static str)>>);

    impl Verdicts {
        fn new(verdicts: &[(f64, &'static str)]) -> Self {
            Self(Mutex::new(verdicts.iter().copied().collect()))
        }
    }

    #[async_trait]
    impl AnswerEvaluator for Verdicts {
        async fn compute_metrics(
            &self,
            _question: &str,
            _answer: &str,
        ) -> AppResult<EvaluationResult> {
            let (score, reason) = self
                .0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or((0.0, "exhausted script"));
            Ok(EvaluationResult::new(score, reason))
        }
    }

    async fn runner_with(
        agent: Arc<RecordingAgent>,
        verdicts: &[(f64, &'static str)],
    ) -> AgentRunner {
        AgentRunner::with_factory(
            Some(agent as Arc<dyn AnswerAgent>),
            Some(deps()),
            Arc::new(Verdicts::new(verdicts)),
            || async { Built::Err(AppError::Internal("factory must not run".to_string())) },
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_default_options() {
        assert_eq!(
            AnswerOptions::default(),
            AnswerOptions {
                limit: 5,
                reflection_threshold: 0.8,
                max_reflections: 2
            }
        );
    }

    #[tokio::test]
    async fn test_agent_without_deps_fails_fast() {
        let agent = Arc::new(RecordingAgent::default());
        let factory_calls = AtomicUsize::new(0);
        let calls = &factory_calls;

        let result = AgentRunner::with_factory(
            Some(agent.clone() as Arc<dyn AnswerAgent>),
            None,
            Arc::new(Verdicts::new(&[])),
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Built::Err(AppError::Internal("unused".to_string()))
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidConfiguration(_))));
        assert_eq!(factory_calls.load(Ordering::SeqCst), 0);
        assert!(agent.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deps_without_agent_fails_fast() {
        let result = AgentRunner::with_factory(
            None,
            Some(deps()),
            Arc::new(Verdicts::new(&[])),
            || async { Built::Err(AppError::Internal("unused".to_string())) },
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_factory_used_when_both_absent() {
        let agent = Arc::new(RecordingAgent::default());
        let built = agent.clone();

        let runner = AgentRunner::with_factory(
            None,
            None,
            Arc::new(Verdicts::new(&[(0.9, "ok")])),
            || async move { Built::Ok((built as Arc<dyn AnswerAgent>, deps())) },
        )
        .await
        .unwrap();

        let answer = runner.answer("Q?", None, AnswerOptions::default()).await.unwrap();
        assert_eq!(answer, "answer #1");
        assert_eq!(agent.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_factory_error_propagates() {
        let result = AgentRunner::with_factory(None, None, Arc::new(Verdicts::new(&[])), || async {
            Built::Err(AppError::LLMApi("no provider".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::LLMApi(_))));
    }

    #[tokio::test]
    async fn test_worked_example() {
        let agent = Arc::new(RecordingAgent::default());
        let runner =
            runner_with(agent.clone(), &[(0.5, "incomplete answer"), (0.9, "complete")]).await;

        let answer = runner
            .answer(
                "What is the capital of France?",
                None,
                AnswerOptions {
                    limit: 5,
                    reflection_threshold: 0.8,
                    max_reflections: 2,
                },
            )
            .await
            .unwrap();

        assert_eq!(answer, "answer #2");
        let prompts = agent.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("User question: What is the capital of France?"));
        assert!(prompts[1].starts_with("Review the previous answer carefully: answer #1"));
    }

    #[tokio::test]
    async fn test_history_and_limit_reach_the_prompt() {
        let agent = Arc::new(RecordingAgent::default());
        let runner = runner_with(agent.clone(), &[(1.0, "complete")]).await;
        let history = vec![ConversationTurn::new("Hi", "Hello")];

        runner
            .answer(
                "And Germany?",
                Some(history.as_slice()),
                AnswerOptions {
                    limit: 9,
                    ..AnswerOptions::default()
                },
            )
            .await
            .unwrap();

        let prompt = &agent.prompts.lock().unwrap()[0];
        assert!(prompt.contains("User: Hi\nAssistant: Hello"));
        assert!(prompt.contains("limit=9"));
    }

    #[tokio::test]
    async fn test_exhausted_budget_returns_last_answer() {
        let agent = Arc::new(RecordingAgent::default());
        let runner =
            runner_with(agent.clone(), &[(0.2, "weak"), (0.3, "weak"), (0.4, "weak")]).await;

        let answer = runner
            .answer("Q?", None, AnswerOptions::default())
            .await
            .unwrap();

        assert_eq!(answer, "answer #3");
        assert_ne!(answer, FALLBACK_ANSWER);
        assert_eq!(agent.prompts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_zero_limit_rejected_before_generation() {
        let agent = Arc::new(RecordingAgent::default());
        let runner = runner_with(agent.clone(), &[(1.0, "ok")]).await;

        let result = runner
            .answer(
                "Q?",
                None,
                AnswerOptions {
                    limit: 0,
                    ..AnswerOptions::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert!(agent.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_calls_are_independent() {
        let agent = Arc::new(RecordingAgent::default());
        let runner =
            runner_with(agent.clone(), &[(0.1, "weak"), (0.9, "good"), (0.9, "good")]).await;

        let first = runner.answer("Q1?", None, AnswerOptions::default()).await.unwrap();
        let second = runner.answer("Q2?", None, AnswerOptions::default()).await.unwrap();

        assert_eq!(first, "answer #2");
        assert_eq!(second, "answer #3");
        let prompts = agent.prompts.lock().unwrap();
        assert!(prompts[2].contains("User question: Q2?"));
        assert!(prompts[2].contains("(no prior turns)"));
    }

    #[tokio::test]
    async fn test_out_of_range_threshold_rejected_before_generation() {
        let agent = Arc::new(RecordingAgent::default());
        let runner = runner_with(agent.clone(), &[(1.0, "fine")]).await;

        for threshold in [f64::NAN, f64::INFINITY, 1.5, -0.1] {
            let result = runner
                .answer(
                    "Q?",
                    None,
                    AnswerOptions {
                        reflection_threshold: threshold,
                        ..AnswerOptions::default()
                    },
                )
                .await;

            assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        }
        assert!(agent.prompts.lock().unwrap().is_empty());

        let boundary = runner
            .answer(
                "Q?",
                None,
                AnswerOptions {
                    reflection_threshold: 1.0,
                    ..AnswerOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(boundary, "answer #1");
    }

    /// Records the limit of every `vector_search` call.
    #[derive(Default)]
    struct LimitRecorder(Mutex<Vec<usize>>);

    #[async_trait]
    impl ContextSearch for LimitRecorder {
        async fn vector_search(&self, _query: &str, limit: usize) -> AppResult<Vec<SearchResult>> {
            self.0.lock().unwrap().push(limit);
            Ok(Vec::new())
        }
    }

    /// Calls `vector_search` without a limit, then answers.
    struct SearchingAgent;

    #[async_trait]
    impl AnswerAgent for SearchingAgent {
        async fn run(&self, _prompt: &str, deps: &AgentDeps) -> AppResult<AgentOutput> {
            let call = ToolCall::VectorSearch {
                query: "capital of France".to_string(),
                limit: None,
            };
            let observation = call.execute(deps).await?;
            Ok(AgentOutput::new(observation))
        }
    }

    #[tokio::test]
    async fn test_call_limit_reaches_context_search() {
        let recorder = Arc::new(LimitRecorder::default());
        let deps = AgentDeps::new(recorder.clone(), None);
        let runner = AgentRunner::with_factory(
            Some(Arc::new(SearchingAgent) as Arc<dyn AnswerAgent>),
            Some(deps),
            Arc::new(Verdicts::new(&[(0.1, "weak"), (0.9, "good"), (0.9, "good")])),
            || async { Built::Err(AppError::Internal("factory must not run".to_string())) },
        )
        .await
        .unwrap();

        let options = AnswerOptions {
            limit: 9,
            ..AnswerOptions::default()
        };
        runner.answer("Q1?", None, options).await.unwrap();
        runner.answer("Q2?", None, AnswerOptions::default()).await.unwrap();

        assert_eq!(*recorder.0.lock().unwrap(), vec![9, 9, 5]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_share_one_runner() {
        let agent = Arc::new(RecordingAgent::default());
        let runner = Arc::new(runner_with(agent.clone(), &[]).await);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let runner = runner.clone();
                tokio::spawn(async move {
                    let question = format!("Question {i}?");
                    runner
                        .answer(&question, None, AnswerOptions::default())
                        .await
                })
            })
            .collect();

        for handle in handles {
            let answer = handle.await.unwrap().unwrap();
            assert!(answer.starts_with("answer #"));
        }

        let prompts = agent.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 24);
        for i in 0..8 {
            let question = format!("User question: Question {i}?");
            assert_eq!(prompts.iter().filter(|p| p.contains(&question)).count(), 1);
        }
    }
}
