//! Scripted `Retriever` used in place of yt-dlp and reqwest

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use url::Url;

use doralink::download::classifier::RetrievalPlan;
use doralink::download::error::RetrievalError;
use doralink::download::source::{ProgressEvent, ResolvedSource, Retriever};

#[derive(Debug, Clone)]
pub enum RetrieverBehavior {
    /// Emits the scripted events, then writes the body
    Succeed,
    FailResolve,
    /// `resolve` never returns
    HangResolve,
    FailFetch,
    /// Emits the scripted events, then never finishes
    Hang,
}

pub struct MockRetriever {
    behavior: RetrieverBehavior,
    title: Option<String>,
    body: Vec<u8>,
    /// (delay before event, event)
    steps: Vec<(Duration, ProgressEvent)>,
    /// Signalled when `resolve` is entered
    pub resolve_started: Arc<Notify>,
    /// Signalled when `fetch` has emitted all steps
    pub fetch_started: Arc<Notify>,
    resolves: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl MockRetriever {
    pub fn new(behavior: RetrieverBehavior) -> Self {
        Self {
            behavior,
            title: None,
            body: vec![0u8; 1024],
            steps: Vec::new(),
            resolve_started: Arc::new(Notify::new()),
            fetch_started: Arc::new(Notify::new()),
            resolves: AtomicUsize::new(0),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_steps(mut self, steps: Vec<(Duration, ProgressEvent)>) -> Self {
        self.steps = steps;
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    /// Links whose bytes were requested, in order
    pub fn fetched_links(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve(&self, plan: &RetrievalPlan) -> Result<ResolvedSource, RetrievalError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.resolve_started.notify_one();
        match self.behavior {
            RetrieverBehavior::FailResolve => return Err(RetrievalError::NotFound("no such media".to_string())),
            RetrieverBehavior::HangResolve => std::future::pending::<()>().await,
            _ => {}
        }
        let media_url = Url::parse(plan.link()).map_err(|e| RetrievalError::Unsupported(e.to_string()))?;
        Ok(ResolvedSource {
            title: self.title.clone(),
            link: plan.link().to_string(),
            media_url,
            extension: Some("mp4".to_string()),
        })
    }

    async fn fetch(
        &self,
        source: &ResolvedSource,
        sink: &Path,
        progress_tx: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<u64, RetrievalError> {
        self.fetched.lock().unwrap().push(source.link.clone());

        for (delay, event) in &self.steps {
            if !delay.is_zero() {
                tokio::time::sleep(*delay).await;
            }
            let _ = progress_tx.send(event.clone());
        }

        match self.behavior {
            RetrieverBehavior::Hang => {
                tokio::fs::write(sink, &self.body[..self.body.len() / 2]).await?;
                self.fetch_started.notify_one();
                std::future::pending::<()>().await;
                Ok(0)
            }
            RetrieverBehavior::FailFetch => {
                tokio::fs::write(sink, b"partial").await?;
                Err(RetrievalError::Network("connection reset".to_string()))
            }
            _ => {
                self.fetch_started.notify_one();
                tokio::fs::write(sink, &self.body).await?;
                let _ = progress_tx.send(ProgressEvent::finished(self.body.len() as u64));
                Ok(self.body.len() as u64)
            }
        }
    }
}
