#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex, Once};
use tempfile::TempDir;

use deskmate::config::DatabaseConfig;
use deskmate::db::{Database, DatabaseBackend, LibSqlBackend, LibSqlVectorStore};
use deskmate::embeddings::{Embedder, EmbeddingTask};
use deskmate::error::{DeskmateError, Result};
use deskmate::intelligence::IntentClassifier;
use deskmate::llm::{ChatModel, CompletionOptions};
use deskmate::models::Turn;
use deskmate::services::{
    InteractionStore, ResponseGenerator, Retriever, SupportAssistant,
};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn database_config(path: &std::path::Path) -> DatabaseConfig {
    DatabaseConfig {
        url: format!("file:{}", path.display()),
        busy_timeout_ms: 5000,
        journal_mode: "WAL".to_string(),
        synchronous: "NORMAL".to_string(),
    }
}

/// Interaction database in a fresh temp directory. Keep the `TempDir` alive
/// for the duration of the test.
pub async fn temp_database() -> (Arc<dyn DatabaseBackend>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let config = database_config(&temp_dir.path().join("deskmate.db"));
    let db = Database::new(&config).await.expect("open database");
    (Arc::new(LibSqlBackend::new(db)), temp_dir)
}

pub async fn temp_vector_store(dir: &TempDir, dimensions: usize) -> LibSqlVectorStore {
    let path = dir.path().join("vectors.db");
    let db = Database::open_local(&path.display().to_string(), &database_config(&path))
        .await
        .expect("open vector db");
    LibSqlVectorStore::open(db, "it_support_test", dimensions, false)
        .await
        .expect("open vector store")
}

/// Embeds text as keyword counts over a fixed vocabulary, plus a constant
/// component so no vector is all zeros.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    pub calls: Mutex<Vec<(Vec<String>, EmbeddingTask)>>,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = self
            .vocabulary
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect();
        vector.push(0.1);
        vector
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String], task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        self.calls.lock().unwrap().push((texts.to_vec(), task));
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len() + 1
    }
}

/// Embedder whose backend is always down.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[String], _task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        Err(DeskmateError::Embedding("embedding service unreachable".to_string()))
    }

    fn dimensions(&self) -> usize {
        4
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub history: Vec<Turn>,
    pub prompt: String,
}

/// Chat model that always gives the same reply and records what it was asked.
pub struct ScriptedModel {
    reply: std::result::Result<String, String>,
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, history: &[Turn], prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            history: history.to_vec(),
            prompt: prompt.to_string(),
        });
        self.reply.clone().map_err(DeskmateError::Llm)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, prompt: &str, _options: Option<&CompletionOptions>) -> Result<String> {
        self.respond(&[], prompt)
    }

    async fn chat(
        &self,
        history: &[Turn],
        prompt: &str,
        _options: Option<&CompletionOptions>,
    ) -> Result<String> {
        self.respond(history, prompt)
    }
}

pub const TEST_VOCABULARY: &[&str] = &["crm", "printer", "password", "vpn", "reload"];

/// Wiring of a full assistant over fakes and a temp database.
pub struct TestHarness {
    pub assistant: Arc<SupportAssistant>,
    pub classifier_model: Arc<ScriptedModel>,
    pub answer_model: Arc<ScriptedModel>,
    pub embedder: Arc<KeywordEmbedder>,
    pub _dir: TempDir,
}

pub async fn harness(
    classifier_model: Arc<ScriptedModel>,
    answer_model: Arc<ScriptedModel>,
    passages: &[&str],
) -> TestHarness {
    let (db, dir) = temp_database().await;
    let embedder = Arc::new(KeywordEmbedder::new(TEST_VOCABULARY));
    let store = temp_vector_store(&dir, embedder.dimensions()).await;

    let documents: Vec<deskmate::models::KnowledgeDocument> = passages
        .iter()
        .enumerate()
        .map(|(i, text)| deskmate::models::KnowledgeDocument {
            id: i.to_string(),
            content: text.to_string(),
            embedding: embedder.vector(text),
        })
        .collect();
    if !documents.is_empty() {
        use deskmate::db::VectorStore;
        store.upsert(&documents).await.expect("seed vector store");
    }

    let assistant = Arc::new(SupportAssistant::new(
        IntentClassifier::new(classifier_model.clone()),
        Retriever::new(embedder.clone(), Arc::new(store), 2),
        ResponseGenerator::new(answer_model.clone()),
        InteractionStore::new(db, 5, 16),
    ));

    TestHarness {
        assistant,
        classifier_model,
        answer_model,
        embedder,
        _dir: dir,
    }
}
