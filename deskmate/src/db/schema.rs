use libsql::Connection;

use crate::error::Result;

/// Tables for chat history and the feedback log.
pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Rolling conversation history per chat, stored as a JSON turn list
        CREATE TABLE IF NOT EXISTS chat_history (
            chat_id INTEGER PRIMARY KEY,
            history TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Question/answer exchanges and the vote cast on them
        CREATE TABLE IF NOT EXISTS feedback_log (
            interaction_id TEXT PRIMARY KEY,
            chat_id INTEGER NOT NULL,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            vote TEXT,
            timestamp TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_feedback_log_chat_id ON feedback_log(chat_id);
        "#,
    )
    .await?;

    Ok(())
}

/// Key-value metadata for the vector store (embedding width and the like).
pub async fn init_meta_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS deskmate_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .await?;

    Ok(())
}

/// Knowledge passages with a fixed-width vector column.
pub async fn create_knowledge_table(conn: &Connection, dimensions: usize) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            content TEXT NOT NULL,
            embedding F32_BLOB({dimensions}),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        );

        CREATE INDEX IF NOT EXISTS idx_knowledge_collection ON knowledge(collection);
        "#
    );
    conn.execute_batch(&sql).await?;

    Ok(())
}

pub async fn drop_knowledge_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP INDEX IF EXISTS idx_knowledge_collection;
        DROP TABLE IF EXISTS knowledge;
        "#,
    )
    .await?;

    Ok(())
}
