mod api;
pub mod types;

pub use api::TelegramClient;
pub use types::{
    CallbackQuery, Chat, ChatKind, InlineKeyboardButton, InlineKeyboardMarkup, Message, Update,
    User,
};
