mod api;
mod provider;


pub use api::{ApiConfig, EmbeddingApiClient};
pub use provider::{Embedder, EmbeddingProvider, EmbeddingTask};
