use thiserror::Error;

/// Why a link could not be retrieved.
///
/// Every variant ends the session in `Done(error)` without partial delivery.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Connection, DNS, timeout or extractor transport failure
    #[error("network error: {0}")]
    Network(String),
    /// Server answered with a non-success status
    #[error("not found: {0}")]
    NotFound(String),
    /// Nothing playable behind the link (unparseable link, extractor found no media, empty body)
    #[error("unsupported link: {0}")]
    Unsupported(String),
    /// Local disk failure while writing the artifact
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetrievalError {
    /// Returns subcategory for logs
    pub fn subcategory(&self) -> &'static str {
        match self {
            RetrievalError::Network(_) => "network",
            RetrievalError::NotFound(_) => "not_found",
            RetrievalError::Unsupported(_) => "unsupported",
            RetrievalError::Io(_) => "io",
        }
    }
}

impl From<reqwest::Error> for RetrievalError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RetrievalError::NotFound(format!("HTTP {}", status)),
            None => RetrievalError::Network(err.to_string()),
        }
    }
}

/// Upload of a fully retrieved artifact failed.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("file is too large to upload: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },
    #[error("upload failed: {0}")]
    Upload(String),
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    Delivered { title: Option<String>, bytes: u64 },
    RetrievalFailed(RetrievalError),
    DeliveryFailed(DeliveryError),
    Cancelled,
}

impl SessionOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, SessionOutcome::Delivered { .. })
    }
}
