use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::{DeskmateError, Result};
use crate::models::{Interaction, Vote, VoteOutcome};

pub struct FeedbackRepository;

impl FeedbackRepository {
    /// Insert a new exchange. An existing `interaction_id` is an integrity
    /// error, never an overwrite.
    pub async fn create(conn: &Connection, interaction: &Interaction) -> Result<()> {
        let affected = conn
            .execute(
                r#"
                INSERT INTO feedback_log (
                    interaction_id, chat_id, question, answer, vote, timestamp
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(interaction_id) DO NOTHING
                "#,
                params![
                    interaction.interaction_id.clone(),
                    interaction.chat_id,
                    interaction.question.clone(),
                    interaction.answer.clone(),
                    interaction.vote.map(|vote| vote.to_string()),
                    interaction.timestamp.to_rfc3339(),
                ],
            )
            .await?;

        if affected == 0 {
            return Err(DeskmateError::DuplicateInteraction(
                interaction.interaction_id.clone(),
            ));
        }

        Ok(())
    }

    /// Record a vote unless one is already stored.
    pub async fn update_vote(
        conn: &Connection,
        interaction_id: &str,
        vote: Vote,
    ) -> Result<VoteOutcome> {
        let affected = conn
            .execute(
                "UPDATE feedback_log SET vote = ?1 WHERE interaction_id = ?2 AND vote IS NULL",
                params![vote.to_string(), interaction_id],
            )
            .await?;

        if affected > 0 {
            return Ok(VoteOutcome::Recorded);
        }

        match Self::get_by_id(conn, interaction_id).await? {
            Some(_) => Ok(VoteOutcome::AlreadyVoted),
            None => Ok(VoteOutcome::UnknownInteraction),
        }
    }

    pub async fn get_by_id(conn: &Connection, interaction_id: &str) -> Result<Option<Interaction>> {
        let mut rows = conn
            .query(
                r#"
                SELECT interaction_id, chat_id, question, answer, vote, timestamp
                FROM feedback_log
                WHERE interaction_id = ?1
                "#,
                params![interaction_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_interaction(&row)?)),
            None => Ok(None),
        }
    }

    fn row_to_interaction(row: &libsql::Row) -> Result<Interaction> {
        let vote: Option<String> = row.get(4)?;
        Ok(Interaction {
            interaction_id: row.get(0)?,
            chat_id: row.get(1)?,
            question: row.get(2)?,
            answer: row.get(3)?,
            vote: vote.and_then(|value| value.parse().ok()),
            timestamp: DateTime::parse_from_rfc3339(&row.get::<String>(5)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
