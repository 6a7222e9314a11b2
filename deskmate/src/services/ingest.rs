use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::db::VectorStore;
use crate::embeddings::{Embedder, EmbeddingTask};
use crate::error::{DeskmateError, Result};
use crate::models::KnowledgeDocument;

/// Loads `.txt` knowledge documents into the vector store.
pub struct KnowledgeIngestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl KnowledgeIngestor {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Embed every `.txt` file in `directory` and upsert it by sequential id.
    ///
    /// A missing directory or one without text files is logged and yields
    /// `Ok(0)`. Embedding or storage failures abort the whole batch.
    pub async fn ingest(&self, directory: &Path) -> Result<usize> {
        if !tokio::fs::try_exists(directory).await.unwrap_or(false) {
            tracing::error!(
                directory = %directory.display(),
                "Knowledge base directory not found"
            );
            return Ok(0);
        }

        let files = list_text_files(directory).await?;
        if files.is_empty() {
            tracing::warn!(
                directory = %directory.display(),
                "No .txt documents found in knowledge base directory"
            );
            return Ok(0);
        }

        let mut contents = Vec::with_capacity(files.len());
        for path in &files {
            let content = tokio::fs::read_to_string(path).await?;
            if content.trim().is_empty() {
                tracing::warn!(file = %path.display(), "Skipping empty document");
                continue;
            }
            contents.push(content);
        }

        if contents.is_empty() {
            tracing::warn!(
                directory = %directory.display(),
                "All knowledge base documents are empty"
            );
            return Ok(0);
        }

        let start = Instant::now();
        tracing::info!(documents = contents.len(), "Embedding knowledge base documents");

        let embeddings = self
            .embedder
            .embed(&contents, EmbeddingTask::Document)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to embed knowledge base documents");
                e
            })?;

        if embeddings.len() != contents.len() {
            let err = DeskmateError::Embedding(format!(
                "Expected {} embeddings, got {}",
                contents.len(),
                embeddings.len()
            ));
            tracing::error!(error = %err, "Embedding count mismatch");
            return Err(err);
        }

        let documents: Vec<KnowledgeDocument> = contents
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (content, embedding))| KnowledgeDocument {
                id: index.to_string(),
                content,
                embedding,
            })
            .collect();

        let written = self.store.upsert(&documents).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to store knowledge base documents");
            e
        })?;

        tracing::info!(
            documents = written,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Knowledge base ingestion complete"
        );

        Ok(written)
    }
}

/// `.txt` files directly inside `directory`, in lexical filename order.
async fn list_text_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(directory).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if is_text && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
