use text_splitter::{ChunkConfig, ChunkSizer, TextSplitter};

use crate::models::Vote;
use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};

pub const WELCOME_TEXT: &str = "Hello! I am an AI support bot. How can I help you today?";

pub const HELP_TEXT: &str = "I answer IT support questions using the bank's knowledge base.\n\n\
/ask <question> - ask a one-off question (works in groups)\n\
/help - show this message\n\n\
In a private chat you can also just write your question, and I will remember the last few messages.";

pub const ASK_USAGE_TEXT: &str =
    "Please ask a question after the /ask command, for example: /ask How do I reset my password?";

pub const VOTE_THANKS_TEXT: &str = "Thanks for your feedback!";
pub const ALREADY_VOTED_TEXT: &str = "You have already voted.";
pub const VOTE_EXPIRED_TEXT: &str = "This answer can no longer be rated.";

const VOTE_PREFIX: &str = "vote";

/// Telegram's limit on one message, in UTF-16 code units.
pub const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Everything after `/ask`, trimmed. May be empty.
    Ask(String),
    Unknown(String),
}

impl Command {
    /// Parse a `/command[@bot] args` message. Returns `None` for plain text.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim_start();
        let rest = text.strip_prefix('/')?;

        let (head, args) = match rest.find(char::is_whitespace) {
            Some(index) => (&rest[..index], rest[index..].trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head).to_lowercase();

        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "ask" => Command::Ask(args.to_string()),
            _ => Command::Unknown(name),
        })
    }
}

/// Callback data for a vote button: `vote:<up|down>:<interaction_id>`.
pub fn vote_callback_data(vote: Vote, interaction_id: &str) -> String {
    format!("{VOTE_PREFIX}:{vote}:{interaction_id}")
}

pub fn parse_vote_callback(data: &str) -> Option<(Vote, &str)> {
    let mut parts = data.splitn(3, ':');
    if parts.next()? != VOTE_PREFIX {
        return None;
    }
    let vote = parts.next()?.parse().ok()?;
    let interaction_id = parts.next().filter(|id| !id.is_empty())?;
    Some((vote, interaction_id))
}

pub fn vote_keyboard(interaction_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![
            InlineKeyboardButton {
                text: "👍".to_string(),
                callback_data: vote_callback_data(Vote::Up, interaction_id),
            },
            InlineKeyboardButton {
                text: "👎".to_string(),
                callback_data: vote_callback_data(Vote::Down, interaction_id),
            },
        ]],
    }
}

/// Measures text the way Telegram does, in UTF-16 code units.
struct Utf16Units;

impl ChunkSizer for Utf16Units {
    fn size(&self, chunk: &str) -> usize {
        chunk.encode_utf16().count()
    }
}

/// Split `text` into pieces of at most `limit` UTF-16 code units, breaking
/// at the coarsest boundary that fits: lines, then sentences, then words.
pub fn split_reply(text: &str, limit: usize) -> Vec<&str> {
    // Any single char fits in two units.
    let splitter = TextSplitter::new(ChunkConfig::new(limit.max(2)).with_sizer(Utf16Units));
    let chunks: Vec<&str> = splitter.chunks(text).collect();

    if chunks.is_empty() {
        return vec![text];
    }
    chunks
}
