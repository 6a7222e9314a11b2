use async_trait::async_trait;

use crate::db::connection::Database;
use crate::db::repository::{FeedbackRepository, HistoryRepository, KnowledgeRepository};
use crate::db::traits::{DatabaseBackend, FeedbackStore, HistoryStore, VectorStore};
use crate::error::{DeskmateError, Result};
use crate::migration;
use crate::models::{Interaction, KnowledgeDocument, Turn, Vote, VoteOutcome};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HistoryStore for LibSqlBackend {
    async fn get_history(&self, chat_id: i64) -> Result<Vec<Turn>> {
        let conn = self.db.connect()?;
        HistoryRepository::get(&conn, chat_id).await
    }
    async fn save_history(&self, chat_id: i64, turns: &[Turn]) -> Result<()> {
        let conn = self.db.connect()?;
        HistoryRepository::save(&conn, chat_id, turns).await
    }
}

#[async_trait]
impl FeedbackStore for LibSqlBackend {
    async fn log_interaction(&self, interaction: &Interaction) -> Result<()> {
        let conn = self.db.connect()?;
        FeedbackRepository::create(&conn, interaction).await
    }
    async fn update_vote(&self, interaction_id: &str, vote: Vote) -> Result<VoteOutcome> {
        let conn = self.db.connect()?;
        let outcome = FeedbackRepository::update_vote(&conn, interaction_id, vote).await?;
        tracing::info!(interaction_id, %vote, ?outcome, "Vote processed");
        Ok(outcome)
    }
    async fn get_interaction(&self, interaction_id: &str) -> Result<Option<Interaction>> {
        let conn = self.db.connect()?;
        FeedbackRepository::get_by_id(&conn, interaction_id).await
    }
}

impl DatabaseBackend for LibSqlBackend {}

/// Vector store backed by a libsql `F32_BLOB` column.
pub struct LibSqlVectorStore {
    db: Database,
    collection: String,
    dimensions: usize,
}

impl LibSqlVectorStore {
    /// Open the store, creating or (with `force_rebuild`) recreating the
    /// knowledge table for `dimensions`.
    pub async fn open(
        db: Database,
        collection: &str,
        dimensions: usize,
        force_rebuild: bool,
    ) -> Result<Self> {
        let conn = db.connect()?;
        migration::prepare_vector_store(&conn, dimensions, force_rebuild).await?;

        Ok(Self {
            db,
            collection: collection.to_string(),
            dimensions,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn check_width(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(DeskmateError::VectorStore(format!(
                "Embedding has {} dimensions, store expects {}",
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LibSqlVectorStore {
    async fn upsert(&self, documents: &[KnowledgeDocument]) -> Result<usize> {
        for doc in documents {
            self.check_width(&doc.embedding)?;
        }
        let conn = self.db.connect()?;
        KnowledgeRepository::upsert_batch(&conn, &self.collection, documents).await
    }

    async fn query(&self, embedding: &[f32], n_results: u32) -> Result<Vec<String>> {
        self.check_width(embedding)?;
        let conn = self.db.connect()?;
        KnowledgeRepository::search_nearest(&conn, &self.collection, embedding, n_results).await
    }

    async fn count(&self) -> Result<u64> {
        let conn = self.db.connect()?;
        KnowledgeRepository::count(&conn, &self.collection).await
    }
}
