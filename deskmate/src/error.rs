use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskmateError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API rate limit exceeded, retry after {retry_after:?} seconds")]
    ApiRateLimit { retry_after: Option<u64> },

    #[error("API authentication error: {0}")]
    ApiAuth(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM rate limit exceeded, retry after {retry_after:?} seconds")]
    LlmRateLimit { retry_after: Option<u64> },

    #[error("LLM returned no content: {0}")]
    EmptyGeneration(String),

    #[error("Unrecognized intent label: {0}")]
    UnrecognizedIntent(String),

    #[error("Interaction already logged: {0}")]
    DuplicateInteraction(String),

    #[error("Telegram API error: {0}")]
    Telegram(String),
}

/// Coarse classification used when deciding how a failure is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An external service (LLM, embeddings, store, HTTP) failed or was unreachable.
    Transient,
    /// The model answered, but with nothing usable.
    MalformedOutput,
    Configuration,
    DataIntegrity,
    Validation,
}

impl DeskmateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeskmateError::Config(_) | DeskmateError::ApiAuth(_) | DeskmateError::LlmUnavailable(_) => {
                ErrorKind::Configuration
            }
            DeskmateError::Validation(_) => ErrorKind::Validation,
            DeskmateError::EmptyGeneration(_) | DeskmateError::UnrecognizedIntent(_) => {
                ErrorKind::MalformedOutput
            }
            DeskmateError::DuplicateInteraction(_) => ErrorKind::DataIntegrity,
            DeskmateError::Database(_)
            | DeskmateError::Embedding(_)
            | DeskmateError::VectorStore(_)
            | DeskmateError::Http(_)
            | DeskmateError::Json(_)
            | DeskmateError::Io(_)
            | DeskmateError::ApiRateLimit { .. }
            | DeskmateError::Llm(_)
            | DeskmateError::LlmRateLimit { .. }
            | DeskmateError::Telegram(_) => ErrorKind::Transient,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeskmateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            DeskmateError::Llm("boom".to_string()).kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            DeskmateError::EmptyGeneration("blocked".to_string()).kind(),
            ErrorKind::MalformedOutput
        );
        assert_eq!(
            DeskmateError::UnrecognizedIntent("Weather".to_string()).kind(),
            ErrorKind::MalformedOutput
        );
        assert_eq!(
            DeskmateError::DuplicateInteraction("abc".to_string()).kind(),
            ErrorKind::DataIntegrity
        );
        assert_eq!(
            DeskmateError::Config("missing".to_string()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_display_messages() {
        let err = DeskmateError::LlmRateLimit { retry_after: Some(5) };
        assert_eq!(
            err.to_string(),
            "LLM rate limit exceeded, retry after Some(5) seconds"
        );
        assert_eq!(
            DeskmateError::Validation("Question cannot be empty".to_string()).to_string(),
            "Validation error: Question cannot be empty"
        );
    }
}
