//! Common test utilities
//!
//! This module is shared across all integration tests. `RecordingTransport`
//! stands in for Telegram; the retrievers come from `mocks`.

#![allow(dead_code)]

pub mod recorder;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use doralink::download::{PipelineContext, Retrievers};

use crate::mocks::MockRetriever;

#[allow(unused_imports)]
pub use recorder::{Call, RecordingTransport};

pub const DIRECT_LINK: &str = "https://files.example.com/media/clip.mp4";
pub const STREAMING_LINK: &str = "https://www.youtube.com/watch?v=abc123";

/// Pipeline wired to test doubles, writing artifacts into `dir`.
pub fn pipeline(
    transport: Arc<RecordingTransport>,
    streaming: Arc<MockRetriever>,
    direct: Arc<MockRetriever>,
    dir: &Path,
) -> PipelineContext {
    PipelineContext {
        transport,
        retrievers: Retrievers::new(streaming, direct),
        download_dir: dir.to_path_buf(),
        edit_interval: Duration::from_millis(3000),
        max_upload_bytes: 50 * 1024 * 1024,
    }
}

/// Files left behind in `dir`.
pub fn leftover_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Asserts that `first` was uploaded (when `uploaded`) and its status message
/// deleted before the status message for `next` was sent.
pub fn assert_settled_before(transport: &RecordingTransport, first: &str, next: &str, uploaded: bool) {
    let timed = transport.timed_calls();
    let status_of = |link: &str| {
        let header = format!("📥 Downloading: {}", link);
        timed
            .iter()
            .enumerate()
            .find_map(|(i, (_, call))| match call {
                Call::SendText { message_id, text, .. } if text.starts_with(&header) => Some((i, *message_id)),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no status message for {}", link))
    };

    let (first_status, first_id) = status_of(first);
    let (next_status, _) = status_of(next);
    assert!(first_status < next_status, "{} started after {}", first, next);

    let deleted = timed
        .iter()
        .position(|(_, call)| matches!(call, Call::Delete { message_id } if *message_id == first_id))
        .unwrap_or_else(|| panic!("status for {} never deleted", first));
    assert!(deleted < next_status, "status for {} deleted after {} started", first, next);
    assert!(timed[deleted].0 <= timed[next_status].0);

    let upload = timed[first_status..next_status]
        .iter()
        .position(|(_, call)| matches!(call, Call::SendVideo { .. }))
        .map(|offset| first_status + offset);
    if uploaded {
        let upload = upload.unwrap_or_else(|| panic!("{} not uploaded before {} started", first, next));
        assert!(upload < deleted, "status for {} deleted before its upload", first);
        assert!(timed[upload].0 <= timed[next_status].0);
    } else {
        assert!(upload.is_none(), "unexpected upload for {}", first);
    }
}
