//! Retrieval backends behind one trait.
//!
//! Built-in backends:
//! - `YtDlpRetriever`: streaming sites via yt-dlp, with fine-grained progress
//! - `HttpRetriever`: direct file URLs, single buffered GET

pub mod http;
pub mod ytdlp;

use crate::download::classifier::RetrievalPlan;
use crate::download::error::RetrievalError;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Stage a retrieval reports itself in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Downloading,
    Finished,
    Errored,
}

impl Phase {
    /// `Finished` and `Errored` are never dropped by throttling
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::Errored)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Starting => "starting",
            Phase::Downloading => "downloading",
            Phase::Finished => "finished",
            Phase::Errored => "error",
        };
        f.write_str(label)
    }
}

/// Progress information emitted during a retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub bytes_done: u64,
    pub bytes_total: Option<u64>,
    /// Bytes per second
    pub rate: Option<f64>,
    pub eta_seconds: Option<u64>,
    pub phase: Phase,
}

impl ProgressEvent {
    pub fn starting() -> Self {
        Self::at_phase(Phase::Starting, 0)
    }

    pub fn finished(bytes_done: u64) -> Self {
        Self {
            bytes_total: Some(bytes_done),
            ..Self::at_phase(Phase::Finished, bytes_done)
        }
    }

    pub fn errored(bytes_done: u64) -> Self {
        Self::at_phase(Phase::Errored, bytes_done)
    }

    fn at_phase(phase: Phase, bytes_done: u64) -> Self {
        Self {
            bytes_done,
            bytes_total: None,
            rate: None,
            eta_seconds: None,
            phase,
        }
    }
}

/// What `resolve` learned about a link before any bytes are downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    /// Human-readable title when the backend knows one
    pub title: Option<String>,
    /// The link as the user sent it
    pub link: String,
    /// URL the media bytes come from
    pub media_url: Url,
    /// Container extension reported by the extractor
    pub extension: Option<String>,
}

/// Capability shared by both retrieval strategies.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Human-readable name of this backend (e.g., "yt-dlp", "http")
    fn name(&self) -> &str;

    /// Learn title and media location without downloading.
    async fn resolve(&self, plan: &RetrievalPlan) -> Result<ResolvedSource, RetrievalError>;

    /// Download into `sink`, sending progress through the channel.
    ///
    /// Returns the number of bytes written. The caller owns `sink` and removes
    /// it on failure.
    async fn fetch(
        &self,
        source: &ResolvedSource,
        sink: &Path,
        progress_tx: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<u64, RetrievalError>;
}

/// Maps each plan variant to its backend.
#[derive(Clone)]
pub struct Retrievers {
    pub streaming: Arc<dyn Retriever>,
    pub direct: Arc<dyn Retriever>,
}

impl Retrievers {
    pub fn new(streaming: Arc<dyn Retriever>, direct: Arc<dyn Retriever>) -> Self {
        Self { streaming, direct }
    }

    /// yt-dlp for streaming sites, reqwest for everything else
    pub fn default_backends() -> Result<Self, RetrievalError> {
        Ok(Self::new(
            Arc::new(ytdlp::YtDlpRetriever::from_config()),
            Arc::new(http::HttpRetriever::new()?),
        ))
    }

    pub fn for_plan(&self, plan: &RetrievalPlan) -> Arc<dyn Retriever> {
        match plan {
            RetrievalPlan::Streaming { .. } => Arc::clone(&self.streaming),
            RetrievalPlan::Direct { .. } => Arc::clone(&self.direct),
        }
    }
}
