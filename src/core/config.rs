use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Folder where artifacts are written while a link is being processed
/// Read from DOWNLOAD_FOLDER environment variable
/// Defaults to `<system temp dir>/doralink`
/// Supports tilde (~) expansion for home directory
pub static DOWNLOAD_FOLDER: Lazy<String> = Lazy::new(|| match env::var("DOWNLOAD_FOLDER") {
    Ok(folder) => shellexpand::tilde(&folder).to_string(),
    Err(_) => env::temp_dir().join("doralink").to_string_lossy().to_string(),
});

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: doralink.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "doralink.log".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Custom Bot API server URL
/// Read from BOT_API_URL environment variable
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| env::var("BOT_API_URL").ok());

/// Access configuration
pub mod access {
    use once_cell::sync::Lazy;
    use std::env;

    /// Parses a comma/whitespace separated list of user ids, skipping garbage entries.
    pub fn parse_user_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Users allowed to talk to the bot
    /// Read from AUTHORIZED_USERS environment variable (comma-separated)
    /// Empty when unset, which locks everyone out
    pub static AUTHORIZED_USERS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("AUTHORIZED_USERS")
            .ok()
            .map(|raw| parse_user_ids(&raw))
            .unwrap_or_default()
    });
}

/// Progress message configuration
pub mod progress {
    use once_cell::sync::Lazy;
    use std::env;
    use std::time::Duration;

    /// Default minimum gap between two edits of the same status message (in milliseconds)
    pub const DEFAULT_EDIT_INTERVAL_MS: u64 = 3000;

    /// Read from PROGRESS_EDIT_INTERVAL_MS environment variable
    pub static EDIT_INTERVAL_MS: Lazy<u64> = Lazy::new(|| {
        env::var("PROGRESS_EDIT_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_EDIT_INTERVAL_MS)
    });

    /// Edit throttle window
    pub fn edit_interval() -> Duration {
        Duration::from_millis(*EDIT_INTERVAL_MS)
    }
}

/// Download configuration
pub mod download {
    use super::Duration;

    /// Timeout for a single yt-dlp invocation (in seconds)
    pub const YTDLP_TIMEOUT_SECS: u64 = 1800;

    /// Timeout for a direct HTTP download (in seconds)
    pub const HTTP_TIMEOUT_SECS: u64 = 600;

    /// Connect timeout for direct HTTP downloads (in seconds)
    pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 30;

    /// yt-dlp command timeout duration
    pub fn ytdlp_timeout() -> Duration {
        Duration::from_secs(YTDLP_TIMEOUT_SECS)
    }

    pub fn http_timeout() -> Duration {
        Duration::from_secs(HTTP_TIMEOUT_SECS)
    }

    pub fn http_connect_timeout() -> Duration {
        Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API requests (in seconds)
    /// Large because video uploads go through the same client
    pub const REQUEST_TIMEOUT_SECS: u64 = 900; // 15 minutes

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

pub mod validation {
    /// Maximum file size for Telegram (50MB in bytes)
    /// Telegram Bot API allows up to 50MB for files
    pub const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024; // 50 MB

    /// Upload limit for the configured Bot API server.
    ///
    /// A local Bot API Server (BOT_API_URL not pointing to api.telegram.org) accepts up to 2 GB.
    pub fn max_upload_bytes() -> u64 {
        match super::BOT_API_URL.as_deref() {
            Some(url) if !url.contains("api.telegram.org") => 2000 * 1024 * 1024,
            _ => MAX_FILE_SIZE_BYTES,
        }
    }
}
