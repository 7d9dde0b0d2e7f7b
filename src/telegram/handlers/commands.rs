//! Entry point implementations (/start, /cancel, link text)
//!
//! Every entry point checks authorization first; an unauthorized sender only
//! ever gets the notice back.

use teloxide::types::ChatId;
use tokio::task::JoinHandle;

use super::types::{HandlerDeps, HandlerError};
use crate::core::auth::UNAUTHORIZED_NOTICE;
use crate::download::classifier::split_links;
use crate::download::error::SessionOutcome;
use crate::telegram::cancel::{CANCEL_PROMPT, CONFIRM_CHOICES};

pub const WELCOME_TEXT: &str = "Welcome to the video uploader bot! Send me the downloadable links in text format.";

/// Returns `true` when `user_id` may use the bot, otherwise replies with the notice.
async fn guard(deps: &HandlerDeps, chat_id: ChatId, user_id: Option<i64>) -> Result<bool, HandlerError> {
    if user_id.is_some_and(|id| deps.authorizer.is_authorized(id)) {
        return Ok(true);
    }

    log::warn!("🚫 Unauthorized access attempt: user={:?} chat={}", user_id, chat_id);
    deps.transport().send_text(chat_id, UNAUTHORIZED_NOTICE).await?;
    Ok(false)
}

/// Handle /start command
pub async fn handle_start(deps: &HandlerDeps, chat_id: ChatId, user_id: Option<i64>) -> Result<(), HandlerError> {
    if !guard(deps, chat_id, user_id).await? {
        return Ok(());
    }
    deps.transport().send_text(chat_id, WELCOME_TEXT).await?;
    Ok(())
}

/// Handle /cancel command: ask for confirmation, the answer arrives as text
pub async fn handle_cancel(deps: &HandlerDeps, chat_id: ChatId, user_id: Option<i64>) -> Result<(), HandlerError> {
    if !guard(deps, chat_id, user_id).await? {
        return Ok(());
    }
    deps.gate.open(chat_id).await;
    deps.transport()
        .send_prompt(chat_id, CANCEL_PROMPT, &CONFIRM_CHOICES)
        .await?;
    Ok(())
}

/// Handle a plain text message.
///
/// A pending `/cancel` confirmation consumes the text. Otherwise each line is a
/// link, and the batch is spawned so the chat stays responsive to `/cancel`;
/// the returned handle resolves once every link has been processed.
pub async fn handle_text(
    deps: &HandlerDeps,
    chat_id: ChatId,
    user_id: Option<i64>,
    text: &str,
) -> Result<Option<JoinHandle<Vec<SessionOutcome>>>, HandlerError> {
    if !guard(deps, chat_id, user_id).await? {
        return Ok(None);
    }

    if deps.gate.is_awaiting(chat_id).await {
        let active = deps.workers.active_session(chat_id).await;
        if let Some(outcome) = deps.gate.answer(chat_id, text, active).await {
            log::info!("Cancel confirmation in chat {}: {:?}", chat_id, outcome);
            deps.transport().send_text(chat_id, outcome.reply_text()).await?;
            return Ok(None);
        }
    }

    let links: Vec<String> = split_links(text).into_iter().map(str::to_string).collect();
    if links.is_empty() {
        return Ok(None);
    }
    log::info!("📨 {} link(s) received in chat {}", links.len(), chat_id);

    let workers = deps.workers.clone();
    let pipeline = deps.pipeline.clone();
    Ok(Some(tokio::spawn(async move {
        workers.run_batch(&pipeline, chat_id, links).await
    })))
}
