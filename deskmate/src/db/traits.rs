use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Interaction, KnowledgeDocument, Turn, Vote, VoteOutcome};

// ---------------------------------------------------------------------------
// Interaction store traits
// ---------------------------------------------------------------------------

/// Rolling per-chat conversation history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Empty when the chat has never been seen.
    async fn get_history(&self, chat_id: i64) -> Result<Vec<Turn>>;
    /// Full replace of the stored sequence.
    async fn save_history(&self, chat_id: i64, turns: &[Turn]) -> Result<()>;
}

/// Append-only log of answered questions and their votes.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn log_interaction(&self, interaction: &Interaction) -> Result<()>;
    async fn update_vote(&self, interaction_id: &str, vote: Vote) -> Result<VoteOutcome>;
    async fn get_interaction(&self, interaction_id: &str) -> Result<Option<Interaction>>;
}

// ---------------------------------------------------------------------------
// Unified backend supertrait
// ---------------------------------------------------------------------------

/// Everything the interaction store needs from one database.
pub trait DatabaseBackend: HistoryStore + FeedbackStore {}

// ---------------------------------------------------------------------------
// Vector store
// ---------------------------------------------------------------------------

/// Nearest-neighbour storage for knowledge passages, scoped to one collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace by id. Returns the number of documents written.
    async fn upsert(&self, documents: &[KnowledgeDocument]) -> Result<usize>;
    /// Up to `n_results` passage texts, nearest first.
    async fn query(&self, embedding: &[f32], n_results: u32) -> Result<Vec<String>>;
    async fn count(&self) -> Result<u64>;
}
