//! Prompt Builder
//!
//! Instruction text sent to the answering agent: the initial retrieval prompt
//! and the corrective prompt used by the reflection loop.

use crate::types::ConversationTurn;

/// Sentence the agent must emit verbatim when retrieval finds nothing relevant.
pub const FALLBACK_ANSWER: &str = "I do not know based on the provided context.";

/// Rendered in place of the history when there are no prior turns.
pub const NO_HISTORY_PLACEHOLDER: &str = "(no prior turns)";

/// Build the initial prompt for a question.
pub fn build_prompt(question: &str, history: Option<&[ConversationTurn]>, limit: usize) -> String {
    let history_text = format_history(history);
    format!(
        "Conversation so far:\n{history_text}\n\n\
         User question: {question}\n\
         First call `vector_search` with query=the question text and limit={limit} to fetch context. \
         If vector search returns nothing useful, call `web_search` to gather public web snippets. \
         Then answer concisely using only the retrieved context. \
         If nothing relevant is returned, say '{FALLBACK_ANSWER}'"
    )
}

/// Build the corrective prompt from the previous answer.
///
/// Does not repeat the question or the tool instructions.
pub fn reflection_prompt(previous_answer: &str) -> String {
    format!(
        "Review the previous answer carefully: {previous_answer}\n\
         Check for factual accuracy, completeness, clarity, and consistency using only retrieved context.\n\
         If there are mistakes or missing details, provide a corrected, concise answer.\n\
         If nothing relevant is available, say exactly: '{FALLBACK_ANSWER}'"
    )
}

/// Render prior turns as `User:` / `Assistant:` lines, oldest first.
pub fn format_history(history: Option<&[ConversationTurn]>) -> String {
    match history {
        Some(turns) if !turns.is_empty() => turns
            .iter()
            .flat_map(|turn| {
                [
                    format!("User: {}", turn.question),
                    format!("Assistant: {}", turn.answer),
                ]
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => NO_HISTORY_PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_or_absent_history_uses_placeholder() {
        assert_eq!(format_history(None), NO_HISTORY_PLACEHOLDER);
        assert_eq!(format_history(Some(&[][..])), NO_HISTORY_PLACEHOLDER);

        let prompt = build_prompt("What is the capital of France?", None, 5);
        assert!(prompt.contains("Conversation so far:\n(no prior turns)\n"));
        assert!(!prompt.contains("User: "));
    }

    #[test]
    fn test_history_lines_keep_order() {
        let history = vec![
            ConversationTurn::new("Hi", "Hello! How can I help?"),
            ConversationTurn::new("Capital of Spain?", "Madrid."),
        ];

        assert_eq!(
            format_history(Some(history.as_slice())),
            "User: Hi\nAssistant: Hello! How can I help?\nUser: Capital of Spain?\nAssistant: Madrid."
        );
    }

    #[test]
    fn test_prompt_contains_question_limit_and_fallback() {
        let prompt = build_prompt("What is the capital of France?", None, 7);

        assert!(prompt.contains("User question: What is the capital of France?\n"));
        assert!(prompt.contains("`vector_search` with query=the question text and limit=7"));
        assert!(prompt.contains("call `web_search`"));
        assert!(prompt.contains("'I do not know based on the provided context.'"));
    }

    #[test]
    fn test_reflection_prompt_embeds_answer_but_not_question() {
        let prompt = reflection_prompt("Paris, probably.");

        assert!(prompt.starts_with("Review the previous answer carefully: Paris, probably.\n"));
        assert!(prompt.contains("factual accuracy, completeness, clarity, and consistency"));
        assert!(prompt.ends_with(&format!("say exactly: '{FALLBACK_ANSWER}'")));
        assert!(!prompt.contains("User question:"));
        assert!(!prompt.contains("vector_search"));
    }
}
