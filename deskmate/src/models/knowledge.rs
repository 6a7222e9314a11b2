use serde::{Deserialize, Serialize};

/// A knowledge-base passage as stored in the vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeDocument {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
}
