use std::sync::Arc;
use std::time::Instant;

use crate::db::VectorStore;
use crate::embeddings::Embedder;
use crate::error::{DeskmateError, Result};

/// Finds the knowledge passages nearest to a question.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    n_results: u32,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, n_results: u32) -> Self {
        Self {
            embedder,
            store,
            n_results,
        }
    }

    pub fn n_results(&self) -> u32 {
        self.n_results
    }

    /// Up to `n_results` passages, nearest first. Errors propagate unchanged.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<String>> {
        if question.trim().is_empty() {
            return Err(DeskmateError::Validation(
                "Question cannot be empty".to_string(),
            ));
        }

        let start = Instant::now();

        let embedding = self.embedder.embed_query(question).await?;
        let passages = self.store.query(&embedding, self.n_results).await?;

        tracing::debug!(
            passages = passages.len(),
            n_results = self.n_results,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Retrieved knowledge passages"
        );

        Ok(passages)
    }
}
