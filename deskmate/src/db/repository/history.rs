use chrono::Utc;
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::Turn;

pub struct HistoryRepository;

impl HistoryRepository {
    pub async fn get(conn: &Connection, chat_id: i64) -> Result<Vec<Turn>> {
        let mut rows = conn
            .query(
                "SELECT history FROM chat_history WHERE chat_id = ?1",
                params![chat_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let raw: String = row.get(0)?;
                Ok(serde_json::from_str(&raw)?)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Replace the stored history for `chat_id` with `turns`.
    pub async fn save(conn: &Connection, chat_id: i64, turns: &[Turn]) -> Result<()> {
        let history = serde_json::to_string(turns)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO chat_history (chat_id, history, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(chat_id) DO UPDATE SET
                history = excluded.history,
                updated_at = excluded.updated_at
            "#,
            params![chat_id, history, now],
        )
        .await?;

        Ok(())
    }
}
