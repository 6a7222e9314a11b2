use chrono::Utc;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use crate::db::DatabaseBackend;
use crate::error::{DeskmateError, Result};
use crate::models::{recent_turns, Interaction, Turn, Vote, VoteOutcome};

const DEFAULT_LOCK_CAPACITY: usize = 1024;

/// Bounded table of per-chat async locks.
///
/// The capacity must exceed the number of chats in flight at once; an evicted
/// lock that is still held no longer excludes a newcomer for the same chat.
#[derive(Clone)]
pub struct ChatLocks {
    locks: Arc<Mutex<LruCache<i64, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ChatLocks {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_LOCK_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            locks: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// The lock guarding `chat_id`, created on first use.
    pub fn for_chat(&self, chat_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        // Poisoning leaves the map intact.
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .get_or_insert(chat_id, || Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_default()
    }
}

/// Chat history and feedback log behind one facade.
#[derive(Clone)]
pub struct InteractionStore {
    db: Arc<dyn DatabaseBackend>,
    locks: ChatLocks,
    history_exchanges: usize,
}

impl InteractionStore {
    pub fn new(db: Arc<dyn DatabaseBackend>, history_exchanges: usize, lock_capacity: usize) -> Self {
        Self {
            db,
            locks: ChatLocks::new(lock_capacity),
            history_exchanges,
        }
    }

    pub fn chat_lock(&self, chat_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.for_chat(chat_id)
    }

    pub async fn get_history(&self, chat_id: i64) -> Result<Vec<Turn>> {
        self.db.get_history(chat_id).await
    }

    pub async fn save_history(&self, chat_id: i64, turns: &[Turn]) -> Result<()> {
        self.db.save_history(chat_id, turns).await
    }

    /// Stored history capped to the configured number of exchanges.
    pub async fn recent_history(&self, chat_id: i64) -> Result<Vec<Turn>> {
        let turns = self.db.get_history(chat_id).await?;
        Ok(recent_turns(&turns, self.history_exchanges))
    }

    /// Append one user/model exchange to the full stored history.
    ///
    /// Callers hold [`chat_lock`](Self::chat_lock) across the read that fed
    /// generation and this write.
    pub async fn append_exchange(&self, chat_id: i64, question: &str, answer: &str) -> Result<()> {
        let mut turns = self.db.get_history(chat_id).await?;
        turns.push(Turn::user(question));
        turns.push(Turn::model(answer));
        self.db.save_history(chat_id, &turns).await?;

        tracing::debug!(chat_id, turns = turns.len(), "History updated");
        Ok(())
    }

    /// Log an answered question under a fresh id and return the id.
    pub async fn log_interaction(&self, chat_id: i64, question: &str, answer: &str) -> Result<String> {
        let interaction_id = nanoid::nanoid!();
        self.log_interaction_with_id(&interaction_id, chat_id, question, answer)
            .await?;
        Ok(interaction_id)
    }

    /// Insert-only; a reused id is a [`DeskmateError::DuplicateInteraction`].
    pub async fn log_interaction_with_id(
        &self,
        interaction_id: &str,
        chat_id: i64,
        question: &str,
        answer: &str,
    ) -> Result<()> {
        if interaction_id.trim().is_empty() {
            return Err(DeskmateError::Validation(
                "Interaction id cannot be empty".to_string(),
            ));
        }

        let interaction = Interaction {
            interaction_id: interaction_id.to_string(),
            chat_id,
            question: question.to_string(),
            answer: answer.to_string(),
            vote: None,
            timestamp: Utc::now(),
        };
        self.db.log_interaction(&interaction).await?;

        tracing::info!(interaction_id, chat_id, "Interaction logged");
        Ok(())
    }

    /// First vote wins. Unknown ids are not an error.
    pub async fn update_vote(&self, interaction_id: &str, vote: Vote) -> Result<VoteOutcome> {
        self.db.update_vote(interaction_id, vote).await
    }

    pub async fn get_interaction(&self, interaction_id: &str) -> Result<Option<Interaction>> {
        self.db.get_interaction(interaction_id).await
    }
}
