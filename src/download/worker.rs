//! Per-chat serialization of link batches.
//!
//! Each chat owns one slot: a FIFO lock so only one batch runs at a time, and
//! the control handle of the session currently in flight so `/cancel` can
//! reach it while the batch keeps running.

use std::collections::HashMap;
use std::sync::Arc;
use teloxide::types::ChatId;
use tokio::sync::Mutex;

use crate::download::error::SessionOutcome;
use crate::download::session::{PipelineContext, SessionControl, TransferSession};

#[derive(Default)]
struct ChatSlot {
    worker: Mutex<()>,
    active: std::sync::Mutex<Option<Arc<SessionControl>>>,
}

impl ChatSlot {
    fn set_active(&self, control: Option<Arc<SessionControl>>) {
        let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *active = control;
    }

    fn active(&self) -> Option<Arc<SessionControl>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[derive(Clone, Default)]
pub struct ChatWorkers {
    slots: Arc<Mutex<HashMap<ChatId, Arc<ChatSlot>>>>,
}

impl ChatWorkers {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, chat_id: ChatId) -> Arc<ChatSlot> {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(chat_id).or_default())
    }

    /// The session currently running in `chat_id`, if any.
    pub async fn active_session(&self, chat_id: ChatId) -> Option<Arc<SessionControl>> {
        let slots = self.slots.lock().await;
        slots.get(&chat_id).and_then(|slot| slot.active())
    }

    /// Runs `links` one after another, in order.
    ///
    /// Waits for any earlier batch of the same chat to finish first. A failing
    /// or cancelled link does not stop the rest of the batch.
    pub async fn run_batch(&self, ctx: &PipelineContext, chat_id: ChatId, links: Vec<String>) -> Vec<SessionOutcome> {
        let slot = self.slot(chat_id).await;
        let _worker = slot.worker.lock().await;

        let mut outcomes = Vec::with_capacity(links.len());
        for link in links {
            let control = SessionControl::new(link);
            slot.set_active(Some(Arc::clone(&control)));

            let outcome = TransferSession::new(ctx, chat_id, control).run().await;
            outcomes.push(outcome);

            slot.set_active(None);
        }
        outcomes
    }
}
