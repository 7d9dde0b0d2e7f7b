//! Two-step `/cancel` confirmation.
//!
//! `/cancel` opens the gate for a chat; the next text message in that chat is
//! taken as the answer and closes it again.

use std::collections::HashMap;
use std::sync::Arc;
use teloxide::types::ChatId;
use tokio::sync::Mutex;

use crate::download::session::SessionControl;

pub const CANCEL_PROMPT: &str = "Are you sure you want to cancel? This will stop the current download process.";
pub const CONFIRM_CHOICES: [&str; 2] = ["Yes", "No"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    AwaitingConfirmation,
}

/// What a confirmation reply resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// "Yes" and a running session accepted the cancel
    Cancelled,
    /// "Yes" but nothing cancellable was running
    NothingToCancel,
    /// Any other answer
    Aborted,
}

impl GateOutcome {
    pub fn reply_text(self) -> &'static str {
        match self {
            GateOutcome::Cancelled => "Download process cancelled.",
            GateOutcome::NothingToCancel => "No download is in progress.",
            GateOutcome::Aborted => "Cancelled request aborted.",
        }
    }
}

pub fn is_confirmation(reply: &str) -> bool {
    reply.trim().eq_ignore_ascii_case("yes")
}

#[derive(Clone, Default)]
pub struct CancellationGate {
    chats: Arc<Mutex<HashMap<ChatId, GateState>>>,
}

impl CancellationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts waiting for a confirmation in `chat_id`. Repeating it is harmless.
    pub async fn open(&self, chat_id: ChatId) {
        let mut chats = self.chats.lock().await;
        chats.insert(chat_id, GateState::AwaitingConfirmation);
    }

    pub async fn is_awaiting(&self, chat_id: ChatId) -> bool {
        let chats = self.chats.lock().await;
        chats.get(&chat_id) == Some(&GateState::AwaitingConfirmation)
    }

    /// Consumes the reply for `chat_id`.
    ///
    /// Returns `None` when the chat was not waiting, so the text should be
    /// treated as links instead.
    pub async fn answer(&self, chat_id: ChatId, reply: &str, active: Option<Arc<SessionControl>>) -> Option<GateOutcome> {
        let state = {
            let mut chats = self.chats.lock().await;
            chats.remove(&chat_id)?
        };

        match state {
            GateState::AwaitingConfirmation if is_confirmation(reply) => {
                let stopped = active.map(|session| session.request_cancel()).unwrap_or(false);
                Some(if stopped {
                    GateOutcome::Cancelled
                } else {
                    GateOutcome::NothingToCancel
                })
            }
            GateState::AwaitingConfirmation => Some(GateOutcome::Aborted),
        }
    }
}
