use std::sync::Arc;

use crate::bot::commands::{
    self, Command, ALREADY_VOTED_TEXT, ASK_USAGE_TEXT, HELP_TEXT, VOTE_EXPIRED_TEXT,
    VOTE_THANKS_TEXT, WELCOME_TEXT,
};
use crate::error::Result;
use crate::models::VoteOutcome;
use crate::services::{fallback, ConversationMode, SupportAssistant};
use crate::telegram::{
    CallbackQuery, ChatKind, InlineKeyboardMarkup, Message, TelegramClient, Update,
};

/// Routes Telegram updates to the assistant and renders its replies.
pub struct Dispatcher {
    telegram: TelegramClient,
    assistant: Arc<SupportAssistant>,
}

impl Dispatcher {
    pub fn new(telegram: TelegramClient, assistant: Arc<SupportAssistant>) -> Self {
        Self {
            telegram,
            assistant,
        }
    }

    pub async fn handle_update(&self, update: Update) -> Result<()> {
        if let Some(query) = update.callback_query {
            return self.handle_callback(query).await;
        }

        if let Some(message) = update.message {
            return self.handle_message(message).await;
        }

        tracing::debug!(update_id = update.update_id, "Ignoring unsupported update");
        Ok(())
    }

    async fn handle_message(&self, message: Message) -> Result<()> {
        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };
        if message.from.as_ref().is_some_and(|user| user.is_bot) {
            return Ok(());
        }

        let chat_id = message.chat.id;
        let is_private = message.chat.kind == ChatKind::Private;

        match Command::parse(text) {
            Some(Command::Start) => self.reply(chat_id, None, WELCOME_TEXT).await,
            Some(Command::Help) => self.reply(chat_id, None, HELP_TEXT).await,
            Some(Command::Ask(question)) if question.is_empty() => {
                self.reply(chat_id, Some(message.message_id), ASK_USAGE_TEXT)
                    .await
            }
            Some(Command::Ask(question)) => {
                self.answer(&message, &question, ConversationMode::OneShot)
                    .await
            }
            Some(Command::Unknown(name)) => {
                tracing::debug!(chat_id, command = %name, "Unknown command");
                if is_private {
                    self.reply(chat_id, None, HELP_TEXT).await
                } else {
                    Ok(())
                }
            }
            None if is_private && !text.trim().is_empty() => {
                self.answer(&message, text.trim(), ConversationMode::Rolling)
                    .await
            }
            None => Ok(()),
        }
    }

    async fn answer(&self, message: &Message, question: &str, mode: ConversationMode) -> Result<()> {
        let chat_id = message.chat.id;
        tracing::info!(chat_id, ?mode, "Received question");

        if let Err(e) = self.telegram.send_chat_action(chat_id, "typing").await {
            tracing::warn!(chat_id, error = %e, "Failed to send typing action");
        }

        let result = self.assistant.answer(chat_id, question, mode).await;

        match fallback::reply_or_apology(result) {
            Ok(reply) => {
                let keyboard = reply
                    .interaction_id
                    .as_deref()
                    .map(commands::vote_keyboard);
                if let Err(e) = self
                    .send_answer(chat_id, message.message_id, &reply.text, keyboard.as_ref())
                    .await
                {
                    tracing::error!(chat_id, error = %e, "Failed to deliver answer");
                    self.reply(chat_id, Some(message.message_id), fallback::GENERIC_APOLOGY)
                        .await?;
                }
            }
            Err(apology) => {
                self.reply(chat_id, Some(message.message_id), apology).await?;
            }
        }
        Ok(())
    }

    /// Send an answer as one or more messages. The first replies to the
    /// question and the vote buttons ride on the last.
    async fn send_answer(
        &self,
        chat_id: i64,
        reply_to: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let chunks = commands::split_reply(text, commands::MAX_MESSAGE_LEN);
        let last = chunks.len() - 1;

        for (index, chunk) in chunks.iter().enumerate() {
            let reply_to = (index == 0).then_some(reply_to);
            let markup = if index == last { keyboard } else { None };
            self.telegram
                .send_message(chat_id, chunk, reply_to, markup)
                .await?;
        }
        Ok(())
    }

    async fn handle_callback(&self, query: CallbackQuery) -> Result<()> {
        let parsed = query
            .data
            .as_deref()
            .and_then(commands::parse_vote_callback);
        let Some((vote, interaction_id)) = parsed else {
            tracing::debug!(callback_id = %query.id, "Ignoring unknown callback data");
            return self.telegram.answer_callback_query(&query.id, None).await;
        };

        let notice = match self.assistant.store().update_vote(interaction_id, vote).await {
            Ok(VoteOutcome::Recorded) => VOTE_THANKS_TEXT,
            Ok(VoteOutcome::AlreadyVoted) => ALREADY_VOTED_TEXT,
            Ok(VoteOutcome::UnknownInteraction) => VOTE_EXPIRED_TEXT,
            Err(e) => {
                tracing::error!(interaction_id, error = %e, "Failed to record vote");
                fallback::GENERIC_APOLOGY
            }
        };

        self.telegram
            .answer_callback_query(&query.id, Some(notice))
            .await?;

        if notice != fallback::GENERIC_APOLOGY {
            if let Some(message) = &query.message {
                if let Err(e) = self
                    .telegram
                    .edit_message_reply_markup(
                        message.chat.id,
                        message.message_id,
                        &InlineKeyboardMarkup::default(),
                    )
                    .await
                {
                    tracing::warn!(error = %e, "Failed to remove vote buttons");
                }
            }
        }

        Ok(())
    }

    async fn reply(&self, chat_id: i64, reply_to: Option<i64>, text: &str) -> Result<()> {
        self.telegram
            .send_message(chat_id, text, reply_to, None)
            .await?;
        Ok(())
    }
}
