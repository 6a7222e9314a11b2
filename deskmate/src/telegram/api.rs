use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::config::TelegramConfig;
use crate::error::{DeskmateError, Result};
use crate::telegram::types::{
    AnswerCallbackQueryRequest, ApiResponse, EditReplyMarkupRequest, GetUpdatesRequest,
    InlineKeyboardMarkup, Message, SendChatActionRequest, SendMessageRequest, Update,
};

const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Slack added on top of the long-poll window before the HTTP request times out.
const POLL_GRACE_SECS: u64 = 10;

/// Minimal Telegram Bot API client over `reqwest`.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    endpoint: String,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let token = config
            .bot_token
            .as_deref()
            .ok_or_else(|| DeskmateError::Config("TELEGRAM_BOT_TOKEN must be set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + POLL_GRACE_SECS))
            .build()
            .map_err(|e| DeskmateError::Telegram(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{token}", config.api_url.trim_end_matches('/')),
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &GetUpdatesRequest {
                offset,
                timeout: self.poll_timeout_secs,
                allowed_updates: ALLOWED_UPDATES,
            },
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message> {
        self.call(
            "sendMessage",
            &SendMessageRequest {
                chat_id,
                text,
                reply_to_message_id: reply_to,
                allow_sending_without_reply: reply_to.map(|_| true),
                reply_markup: markup,
            },
        )
        .await
    }

    pub async fn send_chat_action(&self, chat_id: i64, action: &str) -> Result<()> {
        let _: bool = self
            .call("sendChatAction", &SendChatActionRequest { chat_id, action })
            .await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str, text: Option<&str>) -> Result<()> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQueryRequest {
                    callback_query_id,
                    text,
                },
            )
            .await?;
        Ok(())
    }

    /// Replace a message's inline keyboard; an empty markup removes it.
    pub async fn edit_message_reply_markup(
        &self,
        chat_id: i64,
        message_id: i64,
        markup: &InlineKeyboardMarkup,
    ) -> Result<()> {
        // Answers with the edited Message, or `true` for inline messages.
        let _: serde_json::Value = self
            .call(
                "editMessageReplyMarkup",
                &EditReplyMarkupRequest {
                    chat_id,
                    message_id,
                    reply_markup: markup,
                },
            )
            .await?;
        Ok(())
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // reqwest errors carry the URL, which embeds the bot token.
        let response = self
            .client
            .post(format!("{}/{method}", self.endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| DeskmateError::Telegram(format!("{method} failed: {}", e.without_url())))?;

        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            DeskmateError::Telegram(format!(
                "{method} returned an unreadable response ({status}): {}",
                e.without_url()
            ))
        })?;

        if envelope.ok {
            return envelope
                .result
                .ok_or_else(|| DeskmateError::Telegram(format!("{method} returned no result")));
        }

        if envelope.error_code == Some(429) {
            return Err(DeskmateError::ApiRateLimit {
                retry_after: envelope.parameters.and_then(|p| p.retry_after),
            });
        }

        if matches!(envelope.error_code, Some(401) | Some(404)) && method == "getUpdates" {
            return Err(DeskmateError::ApiAuth(
                "Telegram rejected the bot token".to_string(),
            ));
        }

        Err(DeskmateError::Telegram(format!(
            "{method} failed ({}): {}",
            envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
            envelope.description.unwrap_or_default()
        )))
    }
}
