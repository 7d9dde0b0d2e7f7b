//! In-memory `ChatTransport` that records every call

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use teloxide::types::{ChatId, MessageId};
use tokio::sync::Notify;
use tokio::time::Instant;

use doralink::core::AppError;
use doralink::telegram::{ChatTransport, MessageHandle};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SendText {
        chat_id: ChatId,
        message_id: i32,
        text: String,
    },
    SendPrompt {
        chat_id: ChatId,
        text: String,
        choices: Vec<String>,
    },
    Edit {
        message_id: i32,
        text: String,
    },
    Delete {
        message_id: i32,
    },
    SendVideo {
        chat_id: ChatId,
        path: PathBuf,
        caption: Option<String>,
        /// Whether the file was on disk when the upload started
        existed: bool,
    },
}

/// Pauses `send_video` until released, to hold a session in `Delivering`.
pub struct UploadHold {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<(Instant, Call)>>,
    next_id: AtomicI32,
    fail_uploads: AtomicBool,
    hold: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_uploads() -> Arc<Self> {
        let transport = Self::default();
        transport.fail_uploads.store(true, Ordering::SeqCst);
        Arc::new(transport)
    }

    /// Makes the next uploads wait on `release`, signalling `entered` first.
    pub fn hold_uploads(&self) -> UploadHold {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some((Arc::clone(&entered), Arc::clone(&release)));
        UploadHold { entered, release }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }

    fn next_message_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts of plain messages, in order
    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SendText { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Edit { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<i32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete { message_id } => Some(message_id),
                _ => None,
            })
            .collect()
    }

    pub fn videos(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::SendVideo { .. }))
            .collect()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageHandle, AppError> {
        let message_id = self.next_message_id();
        self.record(Call::SendText {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(MessageHandle {
            chat_id,
            message_id: MessageId(message_id),
        })
    }

    async fn send_prompt(&self, chat_id: ChatId, text: &str, choices: &[&str]) -> Result<MessageHandle, AppError> {
        let message_id = self.next_message_id();
        self.record(Call::SendPrompt {
            chat_id,
            text: text.to_string(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
        });
        Ok(MessageHandle {
            chat_id,
            message_id: MessageId(message_id),
        })
    }

    async fn edit_text(&self, handle: &MessageHandle, text: &str) -> Result<(), AppError> {
        self.record(Call::Edit {
            message_id: handle.message_id.0,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete(&self, handle: &MessageHandle) -> Result<(), AppError> {
        self.record(Call::Delete {
            message_id: handle.message_id.0,
        });
        Ok(())
    }

    async fn send_video(&self, chat_id: ChatId, path: &Path, caption: Option<&str>) -> Result<(), AppError> {
        self.record(Call::SendVideo {
            chat_id,
            path: path.to_path_buf(),
            caption: caption.map(str::to_string),
            existed: path.exists(),
        });

        let hold = self.hold.lock().unwrap().clone();
        if let Some((entered, release)) = hold {
            entered.notify_one();
            release.notified().await;
        }

        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::Config("upload rejected".to_string()));
        }
        Ok(())
    }
}
