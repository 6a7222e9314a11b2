mod feedback;
mod history;
mod knowledge;

pub use feedback::FeedbackRepository;
pub use history::HistoryRepository;
pub use knowledge::KnowledgeRepository;
