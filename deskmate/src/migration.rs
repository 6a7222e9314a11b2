use libsql::Connection;

use crate::db::{schema, MetadataRepository};
use crate::error::{DeskmateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDecision {
    NotNeeded,
    Approved,
    Rejected,
}

/// Check if the configured embedding width matches the vector store.
///
/// A fresh store records the configured width. A mismatch is only approved
/// when `force_rebuild` is set, since every stored vector becomes unusable.
pub async fn check_dimension_compatibility(
    conn: &Connection,
    model_dimensions: usize,
    force_rebuild: bool,
) -> Result<MigrationDecision> {
    let stored_dimensions = MetadataRepository::get_embedding_dimensions(conn).await?;

    match stored_dimensions {
        None => {
            tracing::info!(
                "Fresh vector store, storing embedding dimensions: {}",
                model_dimensions
            );
            MetadataRepository::set_embedding_dimensions(conn, model_dimensions).await?;
            Ok(MigrationDecision::NotNeeded)
        }
        Some(db_dims) if db_dims == model_dimensions => {
            tracing::debug!("Embedding dimensions match: {}", model_dimensions);
            Ok(MigrationDecision::NotNeeded)
        }
        Some(db_dims) => {
            tracing::warn!(
                "Dimension mismatch: vector store has {} dimensions, model produces {}",
                db_dims,
                model_dimensions
            );

            if force_rebuild {
                tracing::info!("Rebuild flag set, recreating the knowledge table");
                Ok(MigrationDecision::Approved)
            } else {
                Ok(MigrationDecision::Rejected)
            }
        }
    }
}

/// Drop every stored passage and recreate the table at the new width.
/// Documents must be ingested again afterwards.
pub async fn rebuild_knowledge_table(conn: &Connection, new_dimensions: usize) -> Result<()> {
    tracing::info!(
        "Rebuilding knowledge table for {} dimensions",
        new_dimensions
    );

    schema::drop_knowledge_table(conn).await?;
    schema::create_knowledge_table(conn, new_dimensions).await?;
    MetadataRepository::set_embedding_dimensions(conn, new_dimensions).await?;

    Ok(())
}

/// Bring the vector store schema in line with `dimensions`, honouring the
/// rebuild flag on mismatch.
pub async fn prepare_vector_store(
    conn: &Connection,
    dimensions: usize,
    force_rebuild: bool,
) -> Result<()> {
    schema::init_meta_schema(conn).await?;

    match check_dimension_compatibility(conn, dimensions, force_rebuild).await? {
        MigrationDecision::NotNeeded => schema::create_knowledge_table(conn, dimensions).await,
        MigrationDecision::Approved => rebuild_knowledge_table(conn, dimensions).await,
        MigrationDecision::Rejected => Err(DeskmateError::Config(format!(
            "Embedding dimension mismatch with the vector store (configured {dimensions}); \
             run `deskmate ingest --rebuild` to recreate it"
        ))),
    }
}
