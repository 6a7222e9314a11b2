use chrono::Utc;
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::KnowledgeDocument;

pub struct KnowledgeRepository;

impl KnowledgeRepository {
    /// Insert or replace documents by id inside one transaction.
    pub async fn upsert_batch(
        conn: &Connection,
        collection: &str,
        documents: &[KnowledgeDocument],
    ) -> Result<usize> {
        let tx = conn.transaction().await?;
        let now = Utc::now().to_rfc3339();

        for doc in documents {
            let embedding_json = serde_json::to_string(&doc.embedding)?;
            tx.execute(
                r#"
                INSERT INTO knowledge (collection, id, content, embedding, created_at, updated_at)
                VALUES (?1, ?2, ?3, vector32(?4), ?5, ?5)
                ON CONFLICT(collection, id) DO UPDATE SET
                    content = excluded.content,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
                params![
                    collection,
                    doc.id.clone(),
                    doc.content.clone(),
                    embedding_json,
                    now.clone(),
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(documents.len())
    }

    /// Passage texts ordered by cosine distance to `embedding`, nearest first.
    pub async fn search_nearest(
        conn: &Connection,
        collection: &str,
        embedding: &[f32],
        limit: u32,
    ) -> Result<Vec<String>> {
        let embedding_json = serde_json::to_string(embedding)?;

        let mut rows = conn
            .query(
                r#"
                SELECT content
                FROM knowledge
                WHERE collection = ?1
                  AND embedding IS NOT NULL
                ORDER BY vector_distance_cos(embedding, vector32(?2)) ASC, id ASC
                LIMIT ?3
                "#,
                params![collection, embedding_json, limit],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(row.get::<String>(0)?);
        }

        Ok(results)
    }

    pub async fn count(conn: &Connection, collection: &str) -> Result<u64> {
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM knowledge WHERE collection = ?1",
                params![collection],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?.max(0) as u64),
            None => Ok(0),
        }
    }
}
