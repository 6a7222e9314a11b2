use std::time::Instant;

use crate::error::Result;
use crate::intelligence::{Intent, IntentClassifier};
use crate::processing::detect_language;
use crate::services::fallback;
use crate::services::generator::ResponseGenerator;
use crate::services::interactions::InteractionStore;
use crate::services::retriever::Retriever;

/// How much conversation context an answer gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationMode {
    /// No history read or written.
    OneShot,
    /// Replays the chat's recent exchanges and appends the new one.
    Rolling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    pub intent: Intent,
    pub language: &'static str,
    /// Set when the answer was logged and can be voted on.
    pub interaction_id: Option<String>,
}

impl AssistantReply {
    pub fn accepts_votes(&self) -> bool {
        self.interaction_id.is_some()
    }
}

/// The answer pipeline: classify, retrieve, generate, then record.
pub struct SupportAssistant {
    classifier: IntentClassifier,
    retriever: Retriever,
    generator: ResponseGenerator,
    store: InteractionStore,
}

impl SupportAssistant {
    pub fn new(
        classifier: IntentClassifier,
        retriever: Retriever,
        generator: ResponseGenerator,
        store: InteractionStore,
    ) -> Self {
        Self {
            classifier,
            retriever,
            generator,
            store,
        }
    }

    pub fn store(&self) -> &InteractionStore {
        &self.store
    }

    /// Answer one message. Classification and generation failures degrade to
    /// defaults; retrieval and persistence failures are returned.
    pub async fn answer(
        &self,
        chat_id: i64,
        question: &str,
        mode: ConversationMode,
    ) -> Result<AssistantReply> {
        let start = Instant::now();
        let language = detect_language(question);
        let intent = self.classifier.classify(question).await;

        let passages = match intent {
            Intent::Question => self.retriever.retrieve(question).await?,
            Intent::Greeting | Intent::Gratitude => Vec::new(),
        };

        let text = match mode {
            ConversationMode::OneShot => {
                self.generator
                    .generate(question, &passages, &[], language)
                    .await
            }
            ConversationMode::Rolling => {
                let lock = self.store.chat_lock(chat_id);
                let _guard = lock.lock().await;

                let history = self.store.recent_history(chat_id).await?;
                let generated = self
                    .generator
                    .try_generate(question, &passages, &history, language)
                    .await;
                let succeeded = matches!(&generated, Ok(text) if !text.trim().is_empty());
                let text = fallback::answer_or_fallback(generated);

                if succeeded {
                    self.store.append_exchange(chat_id, question, &text).await?;
                }
                text
            }
        };

        let interaction_id = if intent == Intent::Question {
            Some(self.store.log_interaction(chat_id, question, &text).await?)
        } else {
            None
        };

        tracing::info!(
            chat_id,
            %intent,
            language,
            passages = passages.len(),
            ?mode,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Answered message"
        );

        Ok(AssistantReply {
            text,
            intent,
            language,
            interaction_id,
        })
    }
}
