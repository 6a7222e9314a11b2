mod assistant;
pub mod fallback;
mod generator;
mod ingest;
mod interactions;
mod retriever;

pub use assistant::{AssistantReply, ConversationMode, SupportAssistant};
pub use generator::ResponseGenerator;
pub use ingest::KnowledgeIngestor;
pub use interactions::{ChatLocks, InteractionStore};
pub use retriever::Retriever;
