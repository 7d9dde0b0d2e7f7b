//! Transfer session: one link from classification to cleanup.
//!
//! ```text
//! Idle -> Resolving -> Downloading -> Delivering -> Done(ok|error)
//!            |  \           |  \
//!            |   Done(error)|   Done(error)
//!            +--------------+--> Cancelling -> Done(error)
//! ```
//!
//! Every path into `Done` goes through `TransferSession::finalize`, which
//! deletes the status message and the local artifact exactly once.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::config;
use crate::download::artifact::{artifact_file_name, LocalArtifact};
use crate::download::classifier::{classify, RetrievalPlan};
use crate::download::error::{DeliveryError, RetrievalError, SessionOutcome};
use crate::download::progress::ProgressReporter;
use crate::download::source::{ProgressEvent, ResolvedSource, Retriever, Retrievers};
use crate::telegram::transport::ChatTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Resolving,
    Downloading,
    Delivering,
    Cancelling,
    Done(Completion),
}

impl SessionState {
    /// States a confirmed cancel can interrupt
    pub fn is_cancellable(self) -> bool {
        matches!(self, SessionState::Resolving | SessionState::Downloading)
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        use Completion::*;
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Resolving)
                | (Resolving, Downloading)
                | (Resolving, Done(Error))
                | (Resolving, Cancelling)
                | (Downloading, Delivering)
                | (Downloading, Done(Error))
                | (Downloading, Cancelling)
                | (Cancelling, Done(Error))
                | (Delivering, Done(Ok))
                | (Delivering, Done(Error))
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Resolving => f.write_str("resolving"),
            SessionState::Downloading => f.write_str("downloading"),
            SessionState::Delivering => f.write_str("delivering"),
            SessionState::Cancelling => f.write_str("cancelling"),
            SessionState::Done(Completion::Ok) => f.write_str("done(ok)"),
            SessionState::Done(Completion::Error) => f.write_str("done(error)"),
        }
    }
}

/// Why `SessionControl::advance` refused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// A cancel was confirmed; the session is now `Cancelling`
    Cancelled,
    Invalid { from: SessionState, to: SessionState },
}

/// State and cancel signal shared between a running session and the cancel gate.
#[derive(Debug)]
pub struct SessionControl {
    link: String,
    state: Mutex<SessionState>,
    token: CancellationToken,
}

impl SessionControl {
    pub fn new(link: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            link: link.into(),
            state: Mutex::new(SessionState::Idle),
            token: CancellationToken::new(),
        })
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SessionState {
        *self.lock_state()
    }

    /// Signals the session to stop.
    ///
    /// Returns `false` without touching the session when it is not in
    /// `Resolving` or `Downloading`, e.g. already delivering.
    pub fn request_cancel(&self) -> bool {
        let state = self.lock_state();
        if state.is_cancellable() {
            self.token.cancel();
            log::info!("Cancel requested for {} while {}", self.link, *state);
            true
        } else {
            false
        }
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once a cancel was accepted.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Moves to `next`.
    ///
    /// A pending cancel wins over any forward move out of a cancellable state:
    /// the session is switched to `Cancelling` and `Cancelled` is returned.
    pub fn advance(&self, next: SessionState) -> Result<(), TransitionError> {
        let mut state = self.lock_state();
        let current = *state;

        if self.token.is_cancelled()
            && current.is_cancellable()
            && !matches!(next, SessionState::Cancelling | SessionState::Done(_))
        {
            *state = SessionState::Cancelling;
            return Err(TransitionError::Cancelled);
        }

        if !current.can_transition_to(next) {
            log::error!("Rejected session transition {} -> {} for {}", current, next, self.link);
            return Err(TransitionError::Invalid { from: current, to: next });
        }

        log::debug!("Session {}: {} -> {}", self.link, current, next);
        *state = next;
        Ok(())
    }
}

/// Everything a session needs that outlives a single link.
#[derive(Clone)]
pub struct PipelineContext {
    pub transport: Arc<dyn ChatTransport>,
    pub retrievers: Retrievers,
    pub download_dir: PathBuf,
    pub edit_interval: Duration,
    pub max_upload_bytes: u64,
}

impl PipelineContext {
    pub fn from_config(transport: Arc<dyn ChatTransport>, retrievers: Retrievers) -> Self {
        Self {
            transport,
            retrievers,
            download_dir: PathBuf::from(config::DOWNLOAD_FOLDER.as_str()),
            edit_interval: config::progress::edit_interval(),
            max_upload_bytes: config::validation::max_upload_bytes(),
        }
    }
}

/// How the download step ended.
enum FetchEnd {
    Completed(Result<u64, RetrievalError>),
    Cancelled,
}

/// Processes exactly one link.
pub struct TransferSession<'a> {
    ctx: &'a PipelineContext,
    chat_id: ChatId,
    control: Arc<SessionControl>,
    plan: RetrievalPlan,
    reporter: ProgressReporter<'a>,
    artifact: Option<LocalArtifact>,
    title: Option<String>,
}

impl<'a> TransferSession<'a> {
    pub fn new(ctx: &'a PipelineContext, chat_id: ChatId, control: Arc<SessionControl>) -> Self {
        let plan = classify(control.link());
        let reporter = ProgressReporter::new(ctx.transport.as_ref(), chat_id, ctx.edit_interval);
        Self {
            ctx,
            chat_id,
            control,
            plan,
            reporter,
            artifact: None,
            title: None,
        }
    }

    /// Runs the session to a terminal state. Never panics on pipeline errors.
    pub async fn run(mut self) -> SessionOutcome {
        let outcome = self.drive().await;
        self.finalize(outcome).await
    }

    async fn drive(&mut self) -> SessionOutcome {
        if let Err(e) = self.control.advance(SessionState::Resolving) {
            return self.interrupted(e);
        }
        log::info!("▶️  Session started for {} ({})", self.control.link(), self.plan.kind());
        self.reporter.start(self.control.link()).await;

        // ── Resolve ──
        let retriever = self.ctx.retrievers.for_plan(&self.plan);
        let resolved = tokio::select! {
            biased;
            _ = self.control.cancelled() => return self.cancel_now(),
            resolved = retriever.resolve(&self.plan) => resolved,
        };
        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(e) => return SessionOutcome::RetrievalFailed(e),
        };
        if let Err(e) = self.control.advance(SessionState::Downloading) {
            return self.interrupted(e);
        }

        self.title = resolved.title.clone();
        if let Some(title) = &resolved.title {
            self.reporter.set_title(title).await;
        }

        // ── Download ──
        if let Err(e) = tokio::fs::create_dir_all(&self.ctx.download_dir).await {
            return SessionOutcome::RetrievalFailed(e.into());
        }
        let file_name = artifact_file_name(&resolved.link, resolved.extension.as_deref());
        self.artifact = Some(LocalArtifact::new(&self.ctx.download_dir, &file_name));

        let bytes = match self.fetch(&resolved, retriever.as_ref()).await {
            FetchEnd::Cancelled => return self.cancel_now(),
            FetchEnd::Completed(Err(e)) => {
                self.reporter.update(ProgressEvent::errored(0)).await;
                return SessionOutcome::RetrievalFailed(e);
            }
            FetchEnd::Completed(Ok(bytes)) => bytes,
        };

        let committed = match &self.artifact {
            Some(artifact) => artifact.commit().await,
            None => Ok(bytes),
        };
        let size = match committed {
            Ok(size) => size,
            Err(e) => return SessionOutcome::RetrievalFailed(e.into()),
        };

        // ── Deliver ──
        if let Err(e) = self.control.advance(SessionState::Delivering) {
            return self.interrupted(e);
        }
        self.deliver(size).await
    }

    async fn fetch(&mut self, resolved: &ResolvedSource, retriever: &dyn Retriever) -> FetchEnd {
        let Some(artifact) = self.artifact.as_ref() else {
            return FetchEnd::Completed(Err(RetrievalError::Unsupported("no artifact allocated".to_string())));
        };
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let mut fetch_fut = retriever.fetch(resolved, artifact.part_path(), progress_tx);
        let control = Arc::clone(&self.control);

        let result = loop {
            let flush_at = self.reporter.pending_due_at();
            tokio::select! {
                biased;
                _ = control.cancelled() => return FetchEnd::Cancelled,
                Some(event) = progress_rx.recv() => self.reporter.update(event).await,
                _ = async {
                    match flush_at {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending::<()>().await,
                    }
                } => self.reporter.flush_pending().await,
                result = &mut fetch_fut => break result,
            }
        };
        drop(fetch_fut);

        // Events sent right before completion, including the terminal one
        while let Ok(event) = progress_rx.try_recv() {
            self.reporter.update(event).await;
        }
        FetchEnd::Completed(result)
    }

    async fn deliver(&mut self, size: u64) -> SessionOutcome {
        if size > self.ctx.max_upload_bytes {
            return SessionOutcome::DeliveryFailed(DeliveryError::TooLarge {
                size,
                limit: self.ctx.max_upload_bytes,
            });
        }
        let Some(artifact) = self.artifact.as_ref() else {
            return SessionOutcome::DeliveryFailed(DeliveryError::Upload("artifact missing".to_string()));
        };

        let caption = self.title.as_ref().map(|t| format!("✅ Download completed: {}", t));
        match self
            .ctx
            .transport
            .send_video(self.chat_id, artifact.path(), caption.as_deref())
            .await
        {
            Ok(()) => SessionOutcome::Delivered {
                title: self.title.clone(),
                bytes: size,
            },
            Err(e) => SessionOutcome::DeliveryFailed(DeliveryError::Upload(e.to_string())),
        }
    }

    fn cancel_now(&self) -> SessionOutcome {
        match self.control.advance(SessionState::Cancelling) {
            Ok(()) | Err(TransitionError::Cancelled) => SessionOutcome::Cancelled,
            Err(e) => self.interrupted(e),
        }
    }

    fn interrupted(&self, err: TransitionError) -> SessionOutcome {
        match err {
            TransitionError::Cancelled => SessionOutcome::Cancelled,
            TransitionError::Invalid { from, to } => SessionOutcome::RetrievalFailed(RetrievalError::Unsupported(
                format!("invalid session transition {} -> {}", from, to),
            )),
        }
    }

    /// Terminal cleanup, once per session.
    async fn finalize(mut self, outcome: SessionOutcome) -> SessionOutcome {
        let completion = if outcome.is_ok() {
            Completion::Ok
        } else {
            Completion::Error
        };
        if let Err(e) = self.control.advance(SessionState::Done(completion)) {
            log::warn!("Session for {} finished outside the state machine: {:?}", self.control.link(), e);
        }

        self.reporter.finish().await;
        if let Some(mut artifact) = self.artifact.take() {
            artifact.remove().await;
        }

        let link = self.control.link();
        let notice = match &outcome {
            SessionOutcome::Delivered { bytes, .. } => {
                log::info!("✅ Delivered {} ({} bytes)", link, bytes);
                None
            }
            SessionOutcome::RetrievalFailed(e) => {
                log::error!("❌ Retrieval failed for {} [{}]: {}", link, e.subcategory(), e);
                Some(self.retrieval_notice(e))
            }
            SessionOutcome::DeliveryFailed(e) => {
                log::error!("❌ Delivery failed for {}: {}", link, e);
                Some(match e {
                    DeliveryError::TooLarge { size, .. } => format!(
                        "The file from link {} is too large to upload ({:.2} MB).",
                        link,
                        *size as f64 / (1024.0 * 1024.0)
                    ),
                    DeliveryError::Upload(_) => format!("Failed to upload the file from link: {}", link),
                })
            }
            SessionOutcome::Cancelled => {
                log::info!("⛔ Session cancelled for {}", link);
                Some(format!("⛔ Download cancelled: {}", link))
            }
        };

        if let Some(text) = notice {
            if let Err(e) = self.ctx.transport.send_text(self.chat_id, &text).await {
                log::warn!("Failed to send notice to chat {}: {}", self.chat_id, e);
            }
        }
        outcome
    }

    fn retrieval_notice(&self, err: &RetrievalError) -> String {
        let link = self.control.link();
        match (&self.plan, err) {
            (RetrievalPlan::Streaming { .. }, RetrievalError::Unsupported(_)) => {
                format!("Failed to download video from link: {}", link)
            }
            (RetrievalPlan::Streaming { .. }, _) => {
                format!("An error occurred while downloading the video from link: {}", link)
            }
            (RetrievalPlan::Direct { .. }, _) => {
                format!("An error occurred while downloading the file from link: {}", link)
            }
        }
    }
}
