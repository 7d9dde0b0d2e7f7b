//! Link splitting and retrieval strategy selection.

use url::Url;

/// Hosts served by the streaming extractor (subdomains included).
const STREAMING_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "soundcloud.com",
    "vimeo.com",
    "tiktok.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "facebook.com",
    "twitch.tv",
    "dailymotion.com",
    "bandcamp.com",
    "reddit.com",
    "bilibili.com",
    "rutube.ru",
    "vk.com",
];

/// Strategy chosen for a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalPlan {
    /// Resolve through the extractor, then download the playable media
    Streaming { link: String },
    /// Plain HTTP GET of the link itself
    Direct { link: String },
}

impl RetrievalPlan {
    pub fn link(&self) -> &str {
        match self {
            RetrievalPlan::Streaming { link } | RetrievalPlan::Direct { link } => link,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RetrievalPlan::Streaming { .. } => "streaming",
            RetrievalPlan::Direct { .. } => "direct",
        }
    }
}

/// Check if the host of a URL is a known streaming site.
fn is_streaming_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host_lower = host.to_lowercase();
    STREAMING_HOSTS
        .iter()
        .any(|d| host_lower == *d || host_lower.ends_with(&format!(".{}", d)))
}

/// Picks the retrieval strategy for a link.
///
/// Anything that does not parse, or is not on a known streaming host, is
/// `Direct` and will fail at fetch time if it is not fetchable.
pub fn classify(link: &str) -> RetrievalPlan {
    match Url::parse(link) {
        Ok(url) if is_streaming_host(&url) => RetrievalPlan::Streaming { link: link.to_string() },
        _ => RetrievalPlan::Direct { link: link.to_string() },
    }
}

/// Splits an inbound message into link tokens, keeping their order.
pub fn split_links(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}
