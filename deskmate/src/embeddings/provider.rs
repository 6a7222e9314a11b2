use async_trait::async_trait;
#[cfg(feature = "local-embeddings")]
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
#[cfg(feature = "local-embeddings")]
use std::sync::{Arc, Mutex};

use crate::config::{default_base_url, parse_provider_model, EmbeddingsConfig};
use crate::embeddings::api::{
    ApiConfig, EmbeddingApiClient, EmbeddingProtocol, GEMINI_NATIVE_BASE_URL,
};
use crate::error::{DeskmateError, Result};

/// Which side of retrieval a text is embedded for. Queries and stored
/// documents are embedded differently, so this must match the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    Query,
    Document,
}

impl EmbeddingTask {
    /// Input prefix e5 models were trained with.
    pub fn prefix(self) -> &'static str {
        match self {
            EmbeddingTask::Query => "query: ",
            EmbeddingTask::Document => "passage: ",
        }
    }

    /// Gemini `taskType` for the native embedding endpoint.
    pub fn gemini_task_type(self) -> &'static str {
        match self {
            EmbeddingTask::Query => "RETRIEVAL_QUERY",
            EmbeddingTask::Document => "RETRIEVAL_DOCUMENT",
        }
    }
}

/// Whether `model_name` belongs to the e5 family, which expects
/// `query: ` / `passage: ` prefixes.
pub fn uses_e5_prefixes(model_name: &str) -> bool {
    model_name
        .to_lowercase()
        .split(&['/', '-', '_'][..])
        .any(|part| part == "e5")
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input, in input order.
    async fn embed(&self, texts: &[String], task: EmbeddingTask) -> Result<Vec<Vec<f32>>>;

    fn dimensions(&self) -> usize;

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed(&[query.to_string()], EmbeddingTask::Query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DeskmateError::Embedding("No embedding generated".to_string()))
    }
}

enum EmbeddingBackend {
    Api {
        client: EmbeddingApiClient,
        batch_size: usize,
    },
    #[cfg(feature = "local-embeddings")]
    Local {
        model: Arc<Mutex<TextEmbedding>>,
        batch_size: usize,
    },
}

pub struct EmbeddingProvider {
    backend: EmbeddingBackend,
    dimensions: usize,
    task_prefix: bool,
}

impl EmbeddingProvider {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let (provider, model_name) = parse_provider_model(&config.model);

        if provider == "local" {
            return Self::new_local(config, model_name);
        }

        let (protocol, base_url) = if provider.eq_ignore_ascii_case("gemini") {
            let base_url = config
                .base_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').trim_end_matches("/openai").to_string())
                .unwrap_or_else(|| GEMINI_NATIVE_BASE_URL.to_string());
            (EmbeddingProtocol::GeminiNative, base_url)
        } else {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(provider).to_string());
            (EmbeddingProtocol::OpenAi, base_url)
        };

        let api_config = ApiConfig {
            base_url,
            api_key: config.api_key.clone(),
            model: model_name.to_string(),
            protocol,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        };

        Ok(Self {
            backend: EmbeddingBackend::Api {
                client: EmbeddingApiClient::new(api_config)?,
                batch_size: config.batch_size.max(1),
            },
            dimensions: config.dimensions,
            task_prefix: config.task_prefix && uses_e5_prefixes(model_name),
        })
    }

    #[cfg(feature = "local-embeddings")]
    fn new_local(config: &EmbeddingsConfig, model_name: &str) -> Result<Self> {
        let kind = resolve_embedding_model(model_name);
        let dimensions = match TextEmbedding::get_model_info(&kind) {
            Ok(info) if info.dim != config.dimensions => {
                tracing::warn!(
                    model = model_name,
                    configured = config.dimensions,
                    actual = info.dim,
                    "EMBEDDING_DIMENSIONS does not match the local model, using the model's width"
                );
                info.dim
            }
            Ok(info) => info.dim,
            Err(_) => config.dimensions,
        };
        let task_prefix = config.task_prefix
            && matches!(
                kind,
                EmbeddingModel::MultilingualE5Small
                    | EmbeddingModel::MultilingualE5Base
                    | EmbeddingModel::MultilingualE5Large
            );

        let model = TextEmbedding::try_new(
            InitOptions::new(kind).with_show_download_progress(true),
        )
        .map_err(|e| DeskmateError::Embedding(e.to_string()))?;

        Ok(Self {
            backend: EmbeddingBackend::Local {
                model: Arc::new(Mutex::new(model)),
                batch_size: config.batch_size.max(1),
            },
            dimensions,
            task_prefix,
        })
    }

    #[cfg(not(feature = "local-embeddings"))]
    fn new_local(_config: &EmbeddingsConfig, model_name: &str) -> Result<Self> {
        Err(DeskmateError::Config(format!(
            "Local embedding model '{model_name}' requires the `local-embeddings` feature"
        )))
    }

    pub fn is_local(&self) -> bool {
        !matches!(self.backend, EmbeddingBackend::Api { .. })
    }

    fn prepare(&self, texts: &[String], task: EmbeddingTask) -> Vec<String> {
        if self.task_prefix {
            texts
                .iter()
                .map(|text| format!("{}{text}", task.prefix()))
                .collect()
        } else {
            texts.to_vec()
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    async fn embed(&self, texts: &[String], task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let inputs = self.prepare(texts, task);

        match &self.backend {
            EmbeddingBackend::Api { client, batch_size } => {
                let mut all_embeddings = Vec::with_capacity(inputs.len());
                for batch in inputs.chunks(*batch_size) {
                    let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
                    let mut embedded = client.embed(&refs, task).await?;
                    all_embeddings.append(&mut embedded);
                }
                Ok(all_embeddings)
            }
            #[cfg(feature = "local-embeddings")]
            EmbeddingBackend::Local { model, batch_size } => {
                let model = Arc::clone(model);
                let batch_size = *batch_size;
                tokio::task::spawn_blocking(move || {
                    let mut model = model.lock().map_err(|e| {
                        DeskmateError::Embedding(format!("Embedding model lock poisoned: {e}"))
                    })?;
                    model
                        .embed(inputs, Some(batch_size))
                        .map_err(|e| DeskmateError::Embedding(e.to_string()))
                })
                .await
                .map_err(|e| DeskmateError::Embedding(format!("Embedding worker failed: {e}")))?
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(feature = "local-embeddings")]
fn resolve_embedding_model(model_name: &str) -> EmbeddingModel {
    match model_name {
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "BAAI/bge-large-en-v1.5" | "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "intfloat/multilingual-e5-small" | "multilingual-e5-small" => {
            EmbeddingModel::MultilingualE5Small
        }
        "intfloat/multilingual-e5-base" | "multilingual-e5-base" => {
            EmbeddingModel::MultilingualE5Base
        }
        "intfloat/multilingual-e5-large" | "multilingual-e5-large" => {
            EmbeddingModel::MultilingualE5Large
        }
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            EmbeddingModel::AllMiniLML6V2
        }
        "nomic-embed-text-v1.5" | "nomic-ai/nomic-embed-text-v1.5" => {
            EmbeddingModel::NomicEmbedTextV15
        }
        _ => EmbeddingModel::MultilingualE5Small,
    }
}
