use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deskmate::bot::{run_polling, Dispatcher};
use deskmate::config::Config;
use deskmate::db::{Database, DatabaseBackend, LibSqlBackend, LibSqlVectorStore, VectorStore};
use deskmate::embeddings::{Embedder, EmbeddingProvider};
use deskmate::intelligence::IntentClassifier;
use deskmate::llm::{ChatModel, LlmBackend, LlmProvider};
use deskmate::services::{
    InteractionStore, KnowledgeIngestor, ResponseGenerator, Retriever, SupportAssistant,
};
use deskmate::telegram::TelegramClient;

#[derive(Parser)]
#[command(name = "deskmate")]
#[command(about = "IT support assistant for Telegram, answering from a knowledge base")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot (default)
    Run,
    /// Embed the knowledge base documents into the vector store
    Ingest {
        /// Directory of .txt documents (defaults to KNOWLEDGE_BASE_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Recreate the vector store when the embedding width changed
        #[arg(long)]
        rebuild: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(config.logging.json);

    match args.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(config).await,
        Commands::Ingest { dir, rebuild } => run_ingest(config, dir, rebuild).await,
    }
}

fn init_tracing(json: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deskmate=info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn open_knowledge_store(
    config: &Config,
    rebuild: bool,
) -> anyhow::Result<(Arc<dyn Embedder>, Arc<dyn VectorStore>)> {
    tracing::info!("Loading embedding model: {}...", config.embeddings.model);
    let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingProvider::new(&config.embeddings)?);

    tracing::info!("Opening vector store at {}...", config.vector_store.path);
    let vector_db = Database::open_local(&config.vector_store.path, &config.database).await?;
    let store = LibSqlVectorStore::open(
        vector_db,
        &config.vector_store.collection,
        embedder.dimensions(),
        rebuild,
    )
    .await?;

    Ok((embedder, Arc::new(store)))
}

async fn run_ingest(config: Config, dir: Option<PathBuf>, rebuild: bool) -> anyhow::Result<()> {
    config.validate_for_ingest()?;

    let directory = dir.unwrap_or_else(|| PathBuf::from(&config.rag.knowledge_base_dir));
    let (embedder, store) = open_knowledge_store(&config, rebuild).await?;

    let ingested = KnowledgeIngestor::new(embedder, store.clone())
        .ingest(&directory)
        .await
        .context("Knowledge base ingestion failed")?;

    tracing::info!(
        ingested,
        total = store.count().await?,
        collection = %config.vector_store.collection,
        "Ingestion finished"
    );
    Ok(())
}

async fn run_bot(config: Config) -> anyhow::Result<()> {
    config.validate_for_bot()?;

    tracing::info!("Initializing database...");
    let db: Arc<dyn DatabaseBackend> =
        Arc::new(LibSqlBackend::new(Database::new(&config.database).await?));

    let (embedder, store) = open_knowledge_store(&config, false).await?;
    if store.count().await? == 0 {
        tracing::warn!(
            "Knowledge base is empty - run `deskmate ingest` to load documents"
        );
    }

    tracing::info!("Initializing LLM provider: {}...", config.llm.model);
    let provider = LlmProvider::new(&config.llm);
    match provider.backend() {
        LlmBackend::Unavailable { reason } => {
            anyhow::bail!("LLM provider unavailable for model {}: {reason}", config.llm.model);
        }
        backend => tracing::info!(?backend, model = %config.llm.model, "LLM provider ready"),
    }
    let llm: Arc<dyn ChatModel> = Arc::new(provider);

    let interactions = InteractionStore::new(
        db,
        config.rag.history_exchanges,
        config.rag.chat_lock_capacity,
    );
    let assistant = Arc::new(SupportAssistant::new(
        IntentClassifier::new(llm.clone()),
        Retriever::new(embedder, store, config.rag.n_results),
        ResponseGenerator::new(llm),
        interactions,
    ));

    let telegram = TelegramClient::new(&config.telegram)?;
    let dispatcher = Arc::new(Dispatcher::new(telegram.clone(), assistant));

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    tracing::info!("Deskmate bot starting");
    run_polling(telegram, dispatcher, cancel_token).await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping the bot...");
    cancel_token.cancel();
}
