use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::embeddings::provider::EmbeddingTask;
use crate::error::{DeskmateError, Result};

/// Gemini's native REST root. The OpenAI-compatible `/openai` path has no
/// task types.
pub const GEMINI_NATIVE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Wire format spoken by the embedding endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProtocol {
    /// `POST {base}/embeddings` with a bearer token.
    OpenAi,
    /// `POST {base}/models/{model}:batchEmbedContents` with an
    /// `x-goog-api-key` header and a `taskType` per text.
    GeminiNative,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub protocol: EmbeddingProtocol,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Client for remote embedding endpoints, OpenAI-compatible or Gemini native.
#[derive(Clone)]
pub struct EmbeddingApiClient {
    client: Client,
    config: ApiConfig,
}

impl EmbeddingApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DeskmateError::Embedding(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Embed `texts` in one request. Vectors come back in input order.
    ///
    /// `task` only reaches the wire for Gemini; OpenAI-compatible servers
    /// have no task field.
    pub async fn embed(&self, texts: &[&str], task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match self.config.protocol {
            EmbeddingProtocol::OpenAi => {
                let request = EmbeddingRequest {
                    model: &self.config.model,
                    input: texts.to_vec(),
                };
                let url = format!("{}/embeddings", self.base_url());
                let body: EmbeddingResponse = self.post(&url, &request).await?;
                Self::ordered_vectors(body, texts.len())
            }
            EmbeddingProtocol::GeminiNative => {
                let model = self.gemini_model_path();
                let request = BatchEmbedRequest {
                    requests: texts
                        .iter()
                        .map(|&text| EmbedContentRequest {
                            model: &model,
                            content: Content {
                                parts: [Part { text }],
                            },
                            task_type: task.gemini_task_type(),
                        })
                        .collect(),
                };
                let url = format!("{}/{model}:batchEmbedContents", self.base_url());
                let body: BatchEmbedResponse = self.post(&url, &request).await?;
                Self::check_count(body.embeddings.len(), texts.len())?;
                Ok(body.embeddings.into_iter().map(|e| e.values).collect())
            }
        }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn gemini_model_path(&self) -> String {
        if self.config.model.starts_with("models/") {
            self.config.model.clone()
        } else {
            format!("models/{}", self.config.model)
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref api_key) = self.config.api_key {
            let (name, value) = match self.config.protocol {
                EmbeddingProtocol::OpenAi => (AUTHORIZATION, format!("Bearer {api_key}")),
                EmbeddingProtocol::GeminiNative => {
                    (HeaderName::from_static("x-goog-api-key"), api_key.clone())
                }
            };
            headers.insert(
                name,
                HeaderValue::from_str(&value).map_err(|e| {
                    DeskmateError::Embedding(format!("Invalid API key header: {e}"))
                })?,
            );
        }

        Ok(headers)
    }

    async fn post<B, R>(&self, url: &str, request: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let headers = self.headers()?;

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(url)
                .headers(headers.clone())
                .json(request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        return resp.json().await.map_err(|e| {
                            DeskmateError::Embedding(format!("Failed to parse response: {e}"))
                        });
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse().ok());
                        last_error = Some(DeskmateError::ApiRateLimit { retry_after });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(DeskmateError::ApiAuth(body));
                    }

                    if status.is_server_error() {
                        let body = resp.text().await.unwrap_or_default();
                        last_error = Some(DeskmateError::Embedding(format!(
                            "Server error {status}: {body}"
                        )));
                        continue;
                    }

                    let body = resp.text().await.unwrap_or_default();
                    return Err(DeskmateError::Embedding(format!(
                        "API error {status}: {body}"
                    )));
                }
                Err(e) => {
                    last_error = Some(DeskmateError::Embedding(format!(
                        "Request failed: {}",
                        e.without_url()
                    )));
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DeskmateError::Embedding("Unknown error".to_string())))
    }

    fn check_count(got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(DeskmateError::Embedding(format!(
                "Expected {expected} embeddings, got {got}"
            )));
        }
        Ok(())
    }

    fn ordered_vectors(body: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
        Self::check_count(body.data.len(), expected)?;

        let mut data = body.data;
        if data.iter().all(|d| d.index.is_some()) {
            data.sort_by_key(|d| d.index);
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}
