//! Chat transport seam used by the pipeline.
//!
//! Sessions, the progress reporter and the cancel gate only talk to the chat
//! through `ChatTransport`; `TelegramTransport` is the teloxide implementation.

use async_trait::async_trait;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{InputFile, KeyboardButton, KeyboardMarkup, MessageId};
use teloxide::RequestError;

use crate::core::error::AppError;
use crate::telegram::Bot;

/// A sent message that can later be edited or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// What the pipeline needs from a chat.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageHandle, AppError>;

    /// Sends a question with a one-time reply keyboard of `choices`.
    async fn send_prompt(&self, chat_id: ChatId, text: &str, choices: &[&str]) -> Result<MessageHandle, AppError>;

    async fn edit_text(&self, handle: &MessageHandle, text: &str) -> Result<(), AppError>;

    async fn delete(&self, handle: &MessageHandle) -> Result<(), AppError>;

    async fn send_video(&self, chat_id: ChatId, path: &Path, caption: Option<&str>) -> Result<(), AppError>;
}

/// `ChatTransport` over the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn is_not_modified(err: &RequestError) -> bool {
    err.to_string().contains("message is not modified")
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageHandle, AppError> {
        let msg = self.bot.send_message(chat_id, text).await?;
        Ok(MessageHandle {
            chat_id,
            message_id: msg.id,
        })
    }

    async fn send_prompt(&self, chat_id: ChatId, text: &str, choices: &[&str]) -> Result<MessageHandle, AppError> {
        let row: Vec<KeyboardButton> = choices.iter().map(|c| KeyboardButton::new(*c)).collect();
        let keyboard = KeyboardMarkup::new(vec![row]).one_time_keyboard().resize_keyboard();

        let msg = self.bot.send_message(chat_id, text).reply_markup(keyboard).await?;
        Ok(MessageHandle {
            chat_id,
            message_id: msg.id,
        })
    }

    async fn edit_text(&self, handle: &MessageHandle, text: &str) -> Result<(), AppError> {
        match self.bot.edit_message_text(handle.chat_id, handle.message_id, text).await {
            Ok(_) => Ok(()),
            // Same content as last time - nothing to do
            Err(e) if is_not_modified(&e) => Ok(()),
            Err(RequestError::RetryAfter(secs)) => {
                log::warn!(
                    "Rate limit hit when editing message: Retry after {}s. Waiting...",
                    secs.seconds()
                );
                tokio::time::sleep(secs.duration()).await;
                match self.bot.edit_message_text(handle.chat_id, handle.message_id, text).await {
                    Ok(_) => Ok(()),
                    Err(e) if is_not_modified(&e) => Ok(()),
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, handle: &MessageHandle) -> Result<(), AppError> {
        self.bot.delete_message(handle.chat_id, handle.message_id).await?;
        Ok(())
    }

    async fn send_video(&self, chat_id: ChatId, path: &Path, caption: Option<&str>) -> Result<(), AppError> {
        let request = self.bot.send_video(chat_id, InputFile::file(path.to_path_buf()));
        match caption {
            Some(caption) => request.caption(caption).await?,
            None => request.await?,
        };
        Ok(())
    }
}
