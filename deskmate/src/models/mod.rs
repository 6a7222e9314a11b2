mod chat;
mod feedback;
mod knowledge;

pub use chat::*;
pub use feedback::*;
pub use knowledge::*;
