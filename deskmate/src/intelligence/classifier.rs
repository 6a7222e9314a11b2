use std::sync::Arc;

use crate::error::{DeskmateError, Result};
use crate::llm::{prompts, ChatModel, CompletionOptions};
use crate::services::fallback;

/// What the user is doing with a message. Only `Question` goes through retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Question,
    Greeting,
    Gratitude,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Question => write!(f, "Question"),
            Intent::Greeting => write!(f, "Greeting"),
            Intent::Gratitude => write!(f, "Gratitude"),
        }
    }
}

const QUOTE_CHARS: &[char] = &['"', '\'', '`', '«', '»'];

impl Intent {
    /// Parse a model reply into a label, tolerating quotes, a trailing
    /// period and any letter case.
    pub fn from_label(raw: &str) -> Option<Self> {
        let cleaned: String = raw.chars().filter(|c| !QUOTE_CHARS.contains(c)).collect();
        let label = cleaned.trim().trim_end_matches('.').trim();

        match label.to_lowercase().as_str() {
            "question" => Some(Intent::Question),
            "greeting" => Some(Intent::Greeting),
            "gratitude" => Some(Intent::Gratitude),
            _ => None,
        }
    }
}

pub struct IntentClassifier {
    llm: Arc<dyn ChatModel>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }

    /// One model call, no retry. Errors carry the raw reply when it is not
    /// one of the known labels.
    pub async fn try_classify(&self, message: &str) -> Result<Intent> {
        let prompt = prompts::intent_classification_prompt(message);
        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens: Some(10),
            stop: None,
        };

        let reply = self.llm.complete(&prompt, Some(&options)).await?;
        Intent::from_label(&reply)
            .ok_or_else(|| DeskmateError::UnrecognizedIntent(reply.trim().to_string()))
    }

    /// Like [`try_classify`](Self::try_classify), but never fails: anything
    /// unexpected is treated as a question.
    pub async fn classify(&self, message: &str) -> Intent {
        fallback::intent_or_default(self.try_classify(message).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Turn;
    use async_trait::async_trait;

    struct ScriptedModel {
        reply: Result<String>,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _prompt: &str, _options: Option<&CompletionOptions>) -> Result<String> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(DeskmateError::Llm(e.to_string())),
            }
        }

        async fn chat(
            &self,
            _history: &[Turn],
            prompt: &str,
            options: Option<&CompletionOptions>,
        ) -> Result<String> {
            self.complete(prompt, options).await
        }
    }

    fn classifier(reply: Result<String>) -> IntentClassifier {
        IntentClassifier::new(Arc::new(ScriptedModel { reply }))
    }

    #[test]
    fn test_from_label_normalizes() {
        assert_eq!(Intent::from_label("Greeting"), Some(Intent::Greeting));
        assert_eq!(Intent::from_label("  gratitude.\n"), Some(Intent::Gratitude));
        assert_eq!(Intent::from_label("\"Question\""), Some(Intent::Question));
        assert_eq!(Intent::from_label("«Greeting»"), Some(Intent::Greeting));
        assert_eq!(Intent::from_label("`GRATITUDE`"), Some(Intent::Gratitude));
        assert_eq!(Intent::from_label("Weather"), None);
        assert_eq!(Intent::from_label(""), None);
    }

    #[tokio::test]
    async fn test_classify_known_label() {
        let intent = classifier(Ok("Greeting".to_string())).classify("hi!").await;
        assert_eq!(intent, Intent::Greeting);
    }

    #[tokio::test]
    async fn test_unrecognized_label_defaults_to_question() {
        let classifier = classifier(Ok("Complaint".to_string()));

        let err = classifier.try_classify("this is awful").await.unwrap_err();
        assert!(matches!(err, DeskmateError::UnrecognizedIntent(ref l) if l == "Complaint"));
        assert_eq!(classifier.classify("this is awful").await, Intent::Question);
    }

    #[tokio::test]
    async fn test_model_failure_defaults_to_question() {
        let classifier = classifier(Err(DeskmateError::Llm("timeout".to_string())));
        assert_eq!(classifier.classify("thanks").await, Intent::Question);
    }
}
