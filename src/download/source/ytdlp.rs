//! YtDlpRetriever: streaming-site backend powered by yt-dlp.
//!
//! `resolve` asks yt-dlp for metadata only (`--dump-single-json`); `fetch`
//! runs the download with a machine-readable progress template and forwards
//! every progress line as a `ProgressEvent`.

use crate::core::config;
use crate::download::classifier::RetrievalPlan;
use crate::download::error::RetrievalError;
use crate::download::source::{Phase, ProgressEvent, ResolvedSource, Retriever};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use url::Url;

/// Marker that starts every line produced by `PROGRESS_TEMPLATE`.
const PROGRESS_MARKER: &str = "[progress]";

/// downloaded_bytes, total (exact or estimated), speed, eta, status
const PROGRESS_TEMPLATE: &str = "download:[progress] %(progress.downloaded_bytes)s \
     %(progress.total_bytes,progress.total_bytes_estimate)s %(progress.speed)s \
     %(progress.eta)s %(progress.status)s";

/// Single-file format, so the reported `url` is the file that gets downloaded.
const FORMAT_SELECTOR: &str = "best";

/// Number of stderr lines kept for error analysis
const STDERR_TAIL_LINES: usize = 50;

/// Subset of the yt-dlp info JSON the pipeline needs.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    url: Option<String>,
    ext: Option<String>,
}

/// Retriever powered by yt-dlp.
pub struct YtDlpRetriever {
    ytdl_bin: String,
    timeout: Duration,
}

impl YtDlpRetriever {
    pub fn new(ytdl_bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ytdl_bin: ytdl_bin.into(),
            timeout,
        }
    }

    pub fn from_config() -> Self {
        Self::new(config::YTDL_BIN.as_str(), config::download::ytdlp_timeout())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.ytdl_bin);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Retriever for YtDlpRetriever {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn resolve(&self, plan: &RetrievalPlan) -> Result<ResolvedSource, RetrievalError> {
        let link = plan.link();
        log::info!("🔎 Resolving via yt-dlp: {}", link);

        let mut cmd = self.command();
        cmd.args([
            "--dump-single-json",
            "--no-playlist",
            "--no-warnings",
            "-f",
            FORMAT_SELECTOR,
            link,
        ]);

        let child = cmd
            .spawn()
            .map_err(|e| RetrievalError::Network(format!("Failed to spawn {}: {}", self.ytdl_bin, e)))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(RetrievalError::Network(format!(
                    "yt-dlp metadata timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr));
        }

        parse_info(link, &output.stdout)
    }

    async fn fetch(
        &self,
        source: &ResolvedSource,
        sink: &Path,
        progress_tx: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<u64, RetrievalError> {
        log::info!("📥 yt-dlp download: {} -> {}", source.link, sink.display());
        let _ = progress_tx.send(ProgressEvent::starting());

        let mut cmd = self.command();
        cmd.args([
            "--no-playlist",
            "--no-warnings",
            "--newline",
            "--no-part",
            "--force-overwrites",
            "-f",
            FORMAT_SELECTOR,
            "--progress-template",
            PROGRESS_TEMPLATE,
            "-o",
        ])
        .arg(sink)
        .arg(&source.link);

        let mut child = cmd
            .spawn()
            .map_err(|e| RetrievalError::Network(format!("Failed to spawn {}: {}", self.ytdl_bin, e)))?;

        let stderr_task = child.stderr.take().map(|stderr| tokio::spawn(collect_tail(stderr)));

        let run = async {
            if let Some(stdout) = child.stdout.take() {
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    log::debug!("yt-dlp stdout: {}", line);
                    if let Some(event) = parse_progress_line(&line) {
                        let _ = progress_tx.send(event);
                    }
                }
            }
            child.wait().await
        };

        let outcome = tokio::time::timeout(self.timeout, run).await;
        let status = match outcome {
            Ok(status) => status?,
            Err(_) => {
                log::error!("yt-dlp process timed out after {}s, killing", self.timeout.as_secs());
                let _ = child.kill().await;
                return Err(RetrievalError::Network(format!(
                    "yt-dlp process timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let stderr_tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            let excerpt: String = stderr_tail.chars().take(500).collect();
            log::error!("❌ yt-dlp exited with {}: {}", status, excerpt);
            return Err(classify_failure(&stderr_tail));
        }

        let written = tokio::fs::metadata(sink).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(RetrievalError::Unsupported(format!("yt-dlp produced no data for {}", source.link)));
        }

        let _ = progress_tx.send(ProgressEvent::finished(written));
        Ok(written)
    }
}

async fn collect_tail<R: AsyncRead + Unpin>(stream: R) -> String {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        log::debug!("yt-dlp stderr: {}", line);
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}

fn parse_info(link: &str, stdout: &[u8]) -> Result<ResolvedSource, RetrievalError> {
    let info: YtDlpInfo = serde_json::from_slice(stdout)
        .map_err(|e| RetrievalError::Unsupported(format!("unreadable yt-dlp metadata: {}", e)))?;

    let media_url = info
        .url
        .as_deref()
        .and_then(|u| Url::parse(u).ok())
        .ok_or_else(|| RetrievalError::Unsupported(format!("no playable URL for {}", link)))?;

    Ok(ResolvedSource {
        title: info.title.filter(|t| !t.trim().is_empty()),
        link: link.to_string(),
        media_url,
        extension: info.ext,
    })
}

/// Maps yt-dlp stderr to the retrieval error taxonomy.
fn classify_failure(stderr: &str) -> RetrievalError {
    let lower = stderr.to_lowercase();
    let detail = stderr
        .lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .unwrap_or_else(|| stderr.lines().last().unwrap_or("yt-dlp failed"))
        .trim()
        .to_string();

    if lower.contains("http error 404") || lower.contains("http error 410") || lower.contains("not found") {
        RetrievalError::NotFound(detail)
    } else if lower.contains("unsupported url")
        || lower.contains("video unavailable")
        || lower.contains("private video")
        || lower.contains("requested format is not available")
        || lower.contains("no video formats")
    {
        RetrievalError::Unsupported(detail)
    } else {
        RetrievalError::Network(detail)
    }
}

fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Parses one `PROGRESS_TEMPLATE` line. `NA` fields become `None`.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let [done, total, speed, eta, status] = parts.as_slice() else {
        return None;
    };

    let phase = match *status {
        "finished" => Phase::Finished,
        "error" => Phase::Errored,
        _ => Phase::Downloading,
    };

    Some(ProgressEvent {
        bytes_done: parse_number(done).map(|v| v as u64).unwrap_or(0),
        bytes_total: parse_number(total).map(|v| v as u64).filter(|v| *v > 0),
        rate: parse_number(speed),
        eta_seconds: parse_number(eta).map(|v| v as u64),
        phase,
    })
}
