use std::sync::Arc;

use crate::error::Result;
use crate::llm::{prompts, ChatModel};
use crate::models::Turn;
use crate::services::fallback;

/// Turns a question, its passages and prior turns into an answer.
#[derive(Clone)]
pub struct ResponseGenerator {
    llm: Arc<dyn ChatModel>,
}

impl ResponseGenerator {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }

    /// `history` must already be truncated by the caller. Nothing is persisted.
    pub async fn try_generate(
        &self,
        question: &str,
        passages: &[String],
        history: &[Turn],
        language_code: &str,
    ) -> Result<String> {
        let prompt = prompts::compose_rag_prompt(question, passages, language_code);

        tracing::debug!(
            history_turns = history.len(),
            passages = passages.len(),
            language = language_code,
            "Generating answer"
        );

        if history.is_empty() {
            self.llm.complete(&prompt, None).await
        } else {
            self.llm.chat(history, &prompt, None).await
        }
    }

    /// Always yields text: failures become the fixed fallback answer.
    pub async fn generate(
        &self,
        question: &str,
        passages: &[String],
        history: &[Turn],
        language_code: &str,
    ) -> String {
        fallback::answer_or_fallback(
            self.try_generate(question, passages, history, language_code)
                .await,
        )
    }
}
