use async_trait::async_trait;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{DeskmateError, Result};
use crate::llm::api::LlmApiClient;
use crate::models::Turn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
}

/// The chat model seam. Implemented by [`LlmProvider`] and by fakes in tests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Stateless single-shot completion.
    async fn complete(&self, prompt: &str, options: Option<&CompletionOptions>) -> Result<String>;

    /// Completion that replays `history` before `prompt`.
    async fn chat(
        &self,
        history: &[Turn],
        prompt: &str,
        options: Option<&CompletionOptions>,
    ) -> Result<String>;
}

#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    client: Option<LlmApiClient>,
}

impl LlmProvider {
    pub fn new(config: &LlmConfig) -> Self {
        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "gemini" => LlmBackend::Gemini,
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => {
                if let Some(base_url) = &config.base_url {
                    LlmBackend::OpenAICompatible {
                        base_url: base_url.clone(),
                    }
                } else {
                    return Self::unavailable(&format!(
                        "Unknown provider in model: {}",
                        config.model
                    ));
                }
            }
        };

        match LlmApiClient::new(config) {
            Ok(client) => Self {
                backend,
                client: Some(client),
            },
            Err(e) => Self::unavailable(&e.to_string()),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            client: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    fn client(&self) -> Result<&LlmApiClient> {
        self.client.as_ref().ok_or_else(|| {
            let reason = match &self.backend {
                LlmBackend::Unavailable { reason } => reason.clone(),
                _ => "No LLM client configured".to_string(),
            };
            DeskmateError::LlmUnavailable(reason)
        })
    }
}

#[async_trait]
impl ChatModel for LlmProvider {
    async fn complete(&self, prompt: &str, options: Option<&CompletionOptions>) -> Result<String> {
        self.client()?.complete(prompt, None, options).await
    }

    async fn chat(
        &self,
        history: &[Turn],
        prompt: &str,
        options: Option<&CompletionOptions>,
    ) -> Result<String> {
        self.client()?.chat(history, prompt, options).await
    }
}
