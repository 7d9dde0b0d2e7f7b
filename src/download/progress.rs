//! Status message rendering and throttled updates.

use std::time::Duration;
use teloxide::types::ChatId;
use tokio::time::Instant;

use crate::download::source::ProgressEvent;
use crate::telegram::transport::{ChatTransport, MessageHandle};

/// Formats a remaining time as `01h 01m 01s`.
///
/// Units go from largest to smallest, each zero-padded to two digits; leading
/// zero units are dropped, so 45 → `45s` and 0 → an empty string.
pub fn format_remaining_time(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let units = [(hours, 'h'), (minutes, 'm'), (seconds, 's')];
    let Some(first) = units.iter().position(|(value, _)| *value > 0) else {
        return String::new();
    };

    units[first..]
        .iter()
        .map(|(value, unit)| format!("{:02}{}", value, unit))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `done/total*100` with two decimals, or `None` when the total is unknown.
pub fn format_percentage(done: u64, total: Option<u64>) -> Option<String> {
    let total = total.filter(|t| *t > 0)?;
    let percent = (done as f64 / total as f64 * 100.0).min(100.0);
    Some(format!("{:.2}%", percent))
}

/// Bytes per second as KB/s with one decimal.
pub fn format_speed(rate: f64) -> String {
    format!("{:.1} KB/s", rate / 1024.0)
}

/// Renders the status message for one event.
///
/// Lines for unknown values are left out entirely.
pub fn render_status(title: &str, event: &ProgressEvent) -> String {
    let mut text = format!("📥 Downloading: {}\n", title);

    if let Some(rate) = event.rate {
        text.push_str(&format!("Speed: {}\n", format_speed(rate)));
    }
    if let Some(percent) = format_percentage(event.bytes_done, event.bytes_total) {
        text.push_str(&format!("Progress: {}\n", percent));
    }
    if let Some(remaining) = event.eta_seconds.map(format_remaining_time).filter(|s| !s.is_empty()) {
        text.push_str(&format!("Remaining time: {}\n", remaining));
    }
    text.push_str(&format!("Status: {}\n", event.phase));
    text.push_str("Note: Please wait for the download to complete before sending another link.");
    text
}

/// One updatable status message owned by a single session.
///
/// Non-terminal events arriving inside the throttle window replace each other
/// as `pending` and are flushed on the next event outside the window; terminal
/// events are flushed immediately.
pub struct ProgressReporter<'a> {
    transport: &'a dyn ChatTransport,
    chat_id: ChatId,
    interval: Duration,
    title: String,
    handle: Option<MessageHandle>,
    last_edit: Option<Instant>,
    last_text: Option<String>,
    pending: Option<ProgressEvent>,
    edits: usize,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(transport: &'a dyn ChatTransport, chat_id: ChatId, interval: Duration) -> Self {
        Self {
            transport,
            chat_id,
            interval,
            title: String::new(),
            handle: None,
            last_edit: None,
            last_text: None,
            pending: None,
            edits: 0,
        }
    }

    /// Sends the initial status message.
    ///
    /// A send failure is logged, the session then runs without a status message.
    pub async fn start(&mut self, title: &str) -> Option<MessageHandle> {
        self.title = title.to_string();
        let text = render_status(&self.title, &ProgressEvent::starting());

        match self.transport.send_text(self.chat_id, &text).await {
            Ok(handle) => {
                self.handle = Some(handle);
                self.last_edit = Some(Instant::now());
                self.last_text = Some(text);
            }
            Err(e) => log::warn!("Failed to send status message for chat {}: {}", self.chat_id, e),
        }
        self.handle
    }

    /// Replaces the provisional title once the source is resolved.
    ///
    /// Inside the throttle window the new title waits for the next allowed edit.
    pub async fn set_title(&mut self, title: &str) {
        if self.title == title {
            return;
        }
        self.title = title.to_string();
        let event = self.pending.take().unwrap_or_else(ProgressEvent::starting);
        if self.window_open() {
            self.render(&event).await;
        } else {
            self.pending = Some(event);
        }
    }

    pub async fn update(&mut self, event: ProgressEvent) {
        if event.phase.is_terminal() {
            self.pending = None;
            self.render(&event).await;
            return;
        }

        if self.window_open() {
            self.pending = None;
            self.render(&event).await;
        } else {
            self.pending = Some(event);
        }
    }

    /// When the coalesced event becomes due, if one is waiting.
    pub fn pending_due_at(&self) -> Option<Instant> {
        self.pending.as_ref()?;
        Some(self.last_edit.map(|at| at + self.interval).unwrap_or_else(Instant::now))
    }

    /// Renders the coalesced event if its throttle window has passed.
    pub async fn flush_pending(&mut self) {
        let due = self.pending_due_at().map(|at| at <= Instant::now()).unwrap_or(false);
        if due {
            if let Some(event) = self.pending.take() {
                self.render(&event).await;
            }
        }
    }

    /// Deletes the status message. Only the first call has an effect.
    pub async fn finish(&mut self) {
        self.pending = None;
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.transport.delete(&handle).await {
                log::warn!("Failed to delete status message in chat {}: {}", handle.chat_id, e);
            }
        }
    }

    pub fn handle(&self) -> Option<MessageHandle> {
        self.handle
    }

    /// Edits sent so far, the initial message excluded
    pub fn edits(&self) -> usize {
        self.edits
    }

    fn window_open(&self) -> bool {
        self.last_edit
            .map(|at| at.elapsed() >= self.interval)
            .unwrap_or(true)
    }

    async fn render(&mut self, event: &ProgressEvent) {
        let Some(handle) = self.handle else {
            return;
        };
        let text = render_status(&self.title, event);
        if self.last_text.as_deref() == Some(text.as_str()) {
            return;
        }

        match self.transport.edit_text(&handle, &text).await {
            Ok(()) => {
                self.edits += 1;
                self.last_text = Some(text);
            }
            Err(e) => log::warn!("Failed to edit status message in chat {}: {}", handle.chat_id, e),
        }
        self.last_edit = Some(Instant::now());
    }
}
