//! Transient local file holding the bytes of one link.

use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use url::Url;

/// Longest file-name stem taken from a link's last path segment.
const MAX_STEM_LEN: usize = 64;

/// Builds the deterministic artifact file name for a link.
///
/// `<12 hex chars of sha256(link)>-<sanitized last path segment>`, or
/// `<hash>.<extension>` when the extractor reported the container format.
pub fn artifact_file_name(link: &str, extension: Option<&str>) -> String {
    let digest = Sha256::digest(link.as_bytes());
    let hash = &hex::encode(digest)[..12];

    if let Some(ext) = extension.map(sanitize).filter(|e| !e.is_empty()) {
        return format!("{}.{}", hash, ext);
    }

    let segment = Url::parse(link)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::decode(&s).map(|d| d.into_owned()).unwrap_or(s))
        .map(|s| sanitize(&s))
        .filter(|s| !s.is_empty() && s != "." && s != "..");

    match segment {
        Some(stem) => format!("{}-{}", hash, stem),
        None => format!("{}.bin", hash),
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .take(MAX_STEM_LEN)
        .collect()
}

/// A downloaded file owned by exactly one session.
///
/// Bytes are written to `part_path()` and only `commit()` makes them visible
/// at `path()`, so an upload never sees a file that is still being written.
/// Both paths are removed by `remove()` and, as a last resort, on drop.
#[derive(Debug)]
pub struct LocalArtifact {
    path: PathBuf,
    part_path: PathBuf,
    removed: bool,
}

impl LocalArtifact {
    pub fn new(dir: &Path, file_name: &str) -> Self {
        let path = dir.join(file_name);
        let part_path = dir.join(format!("{}.part", file_name));
        Self {
            path,
            part_path,
            removed: false,
        }
    }

    /// Final location, valid after `commit()`
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location retrievers write to
    pub fn part_path(&self) -> &Path {
        &self.part_path
    }

    /// Moves the fully written part file into place.
    pub async fn commit(&self) -> std::io::Result<u64> {
        tokio::fs::rename(&self.part_path, &self.path).await?;
        let meta = tokio::fs::metadata(&self.path).await?;
        Ok(meta.len())
    }

    /// Deletes the artifact and any leftover part file. Safe to call repeatedly.
    pub async fn remove(&mut self) {
        for path in [&self.path, &self.part_path] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => log::debug!("Removed artifact {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove artifact {}: {}", path.display(), e),
            }
        }
        self.removed = true;
    }

    pub fn exists(&self) -> bool {
        self.path.exists() || self.part_path.exists()
    }
}

impl Drop for LocalArtifact {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        for path in [&self.path, &self.part_path] {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != ErrorKind::NotFound {
                    log::warn!("Failed to remove artifact {} on drop: {}", path.display(), e);
                }
            }
        }
    }
}
