pub mod commands;
mod dispatcher;
mod poller;

pub use commands::Command;
pub use dispatcher::Dispatcher;
pub use poller::run_polling;
