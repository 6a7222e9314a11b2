use serde::Deserialize;
use std::env;

use crate::error::{DeskmateError, Result};

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// First non-empty value among `vars`.
fn env_any(vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|var| env::var(var).ok())
        .map(|val| val.trim().to_string())
        .find(|val| !val.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub embeddings: EmbeddingsConfig,
    pub database: DatabaseConfig,
    pub vector_store: VectorStoreConfig,
    pub rag: RagConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub api_url: String,
    pub poll_timeout_secs: u64,
}

/// LLM configuration for chat/completion models
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub dimensions: usize,
    pub batch_size: usize,
    /// Prefix inputs with `query: ` / `passage: ` so the model can tell
    /// retrieval queries from stored documents.
    pub task_prefix: bool,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Local libsql database for chat history and feedback.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
    pub synchronous: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorStoreConfig {
    pub path: String,
    pub collection: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    pub knowledge_base_dir: String,
    /// Number of passages retrieved per question (K).
    pub n_results: u32,
    /// Question/answer exchanges replayed into the model (2 turns each).
    pub history_exchanges: usize,
    pub chat_lock_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        let llm_api_key = env_any(&["LLM_API_KEY", "GEMINI_API_KEY"]);
        let embedding_model =
            env::var("EMBEDDING_MODEL").unwrap_or_else(|_| "gemini/text-embedding-004".to_string());

        Self {
            telegram: TelegramConfig {
                bot_token: env_any(&["TELEGRAM_BOT_TOKEN"]),
                api_url: env::var("TELEGRAM_API_URL")
                    .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
                poll_timeout_secs: parse_env_or("TELEGRAM_POLL_TIMEOUT", 30),
            },
            llm: LlmConfig {
                model: env::var("LLM_MODEL")
                    .unwrap_or_else(|_| "gemini/gemini-1.5-flash".to_string()),
                api_key: llm_api_key.clone(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 30),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 0),
            },
            embeddings: EmbeddingsConfig {
                dimensions: parse_env_or(
                    "EMBEDDING_DIMENSIONS",
                    default_embedding_dimensions(&embedding_model),
                ),
                model: embedding_model,
                api_key: env_any(&["EMBEDDING_API_KEY"]).or(llm_api_key),
                base_url: env::var("EMBEDDING_BASE_URL").ok(),
                batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", 64),
                task_prefix: parse_env_or("EMBEDDING_TASK_PREFIX", true),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT", 30),
                max_retries: parse_env_or("EMBEDDING_MAX_RETRIES", 0),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:deskmate.db".to_string()),
                busy_timeout_ms: parse_env_or("DATABASE_BUSY_TIMEOUT_MS", 5000),
                journal_mode: env::var("DATABASE_JOURNAL_MODE")
                    .unwrap_or_else(|_| "WAL".to_string()),
                synchronous: env::var("DATABASE_SYNCHRONOUS")
                    .unwrap_or_else(|_| "NORMAL".to_string()),
            },
            vector_store: VectorStoreConfig {
                path: env::var("VECTOR_STORE_PATH")
                    .unwrap_or_else(|_| "vector_store.db".to_string()),
                collection: env::var("COLLECTION_NAME")
                    .unwrap_or_else(|_| "bank_it_support".to_string()),
            },
            rag: RagConfig {
                knowledge_base_dir: env::var("KNOWLEDGE_BASE_DIR")
                    .unwrap_or_else(|_| "knowledge_base".to_string()),
                n_results: parse_env_or("RAG_RESULTS", 3),
                history_exchanges: parse_env_or("HISTORY_EXCHANGES", 5),
                chat_lock_capacity: parse_env_or("CHAT_LOCK_CAPACITY", 1024),
            },
            logging: LoggingConfig {
                json: env::var("LOG_FORMAT")
                    .map(|format| format.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Credentials the chat bot cannot start without.
    pub fn validate_for_bot(&self) -> Result<()> {
        if self.telegram.bot_token.is_none() {
            return Err(DeskmateError::Config(
                "TELEGRAM_BOT_TOKEN must be set".to_string(),
            ));
        }
        self.validate_for_ingest()?;
        if requires_api_key(&self.llm.model) && self.llm.api_key.is_none() {
            return Err(DeskmateError::Config(
                "LLM_API_KEY (or GEMINI_API_KEY) must be set".to_string(),
            ));
        }
        if self.rag.n_results == 0 {
            return Err(DeskmateError::Config(
                "RAG_RESULTS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_for_ingest(&self) -> Result<()> {
        let (provider, _) = parse_provider_model(&self.embeddings.model);
        if provider != "local"
            && requires_api_key(&self.embeddings.model)
            && self.embeddings.api_key.is_none()
        {
            return Err(DeskmateError::Config(
                "EMBEDDING_API_KEY (or LLM_API_KEY) must be set for remote embeddings".to_string(),
            ));
        }
        if self.embeddings.dimensions == 0 {
            return Err(DeskmateError::Config(
                "EMBEDDING_DIMENSIONS must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn requires_api_key(model: &str) -> bool {
    let (provider, _) = parse_llm_provider_model(model);
    !matches!(
        provider.to_lowercase().as_str(),
        "ollama" | "local" | "lmstudio"
    )
}

/// Vector width an embedding model produces, used when
/// `EMBEDDING_DIMENSIONS` is not set.
///
/// Bare model names run locally and fall back to multilingual-e5-small
/// (384) when unrecognized. Remote models default to 768, the width of
/// Gemini's text-embedding-004.
pub fn default_embedding_dimensions(model: &str) -> usize {
    let (provider, name) = parse_provider_model(model);
    let name = name.to_lowercase();
    let name = name.rsplit('/').next().unwrap_or_default();

    match name {
        "bge-base-en-v1.5" | "multilingual-e5-base" | "nomic-embed-text-v1.5" => 768,
        "bge-large-en-v1.5" | "multilingual-e5-large" => 1024,
        "bge-small-en-v1.5" | "multilingual-e5-small" | "all-minilm-l6-v2" => 384,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        "text-embedding-3-large" | "gemini-embedding-001" => 3072,
        _ if provider == "local" => 384,
        _ => 768,
    }
}

/// Known embedding providers that use OpenAI-compatible APIs
const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "gemini", "ollama", "lmstudio", "local"];

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "gemini", "ollama", "lmstudio"];

/// Parse a model name into (provider, model) tuple.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        // Check if prefix is a known provider
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to local provider
    ("local", model)
}

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}

/// Provider-specific default base URLs
pub fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "gemini" => "https://generativelanguage.googleapis.com/v1beta/openai",
        "ollama" => "http://localhost:11434/v1",
        "lmstudio" => "http://localhost:1234/v1",
        _ => "https://api.openai.com/v1",
    }
}
