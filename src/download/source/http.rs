//! HttpRetriever: direct HTTP download of the link itself.
//!
//! The body is buffered in full, so only `Starting` and `Finished` progress
//! events are emitted.

use crate::core::config;
use crate::download::classifier::RetrievalPlan;
use crate::download::error::RetrievalError;
use crate::download::source::{ProgressEvent, ResolvedSource, Retriever};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use tokio::sync::mpsc;
use url::Url;

/// Retriever for direct HTTP file downloads.
pub struct HttpRetriever {
    client: Client,
}

impl HttpRetriever {
    pub fn new() -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; doralink/0.1)")
            .timeout(config::download::http_timeout())
            .connect_timeout(config::download::http_connect_timeout())
            .build()
            .map_err(|e| RetrievalError::Network(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    fn name(&self) -> &str {
        "http"
    }

    async fn resolve(&self, plan: &RetrievalPlan) -> Result<ResolvedSource, RetrievalError> {
        let link = plan.link();
        let url = Url::parse(link).map_err(|e| RetrievalError::Unsupported(format!("{}: {}", link, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RetrievalError::Unsupported(format!("scheme '{}' is not fetchable", url.scheme())));
        }

        Ok(ResolvedSource {
            title: None,
            link: link.to_string(),
            media_url: url,
            extension: None,
        })
    }

    async fn fetch(
        &self,
        source: &ResolvedSource,
        sink: &Path,
        progress_tx: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<u64, RetrievalError> {
        log::info!("📥 HTTP direct download: {}", source.media_url);
        let _ = progress_tx.send(ProgressEvent::starting());

        let response = self.client.get(source.media_url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::NotFound(format!("HTTP {} for {}", status, source.media_url)));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(RetrievalError::Unsupported(format!("empty body from {}", source.media_url)));
        }

        tokio::fs::write(sink, &body).await?;
        let written = body.len() as u64;

        log::info!(
            "✅ HTTP download complete: {} ({:.2} MB)",
            sink.display(),
            written as f64 / (1024.0 * 1024.0)
        );
        let _ = progress_tx.send(ProgressEvent::finished(written));

        Ok(written)
    }
}
