use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::funnel::FunnelStage;
use crate::ConfigError;

pub const PLATFORM_BLUESKY: &str = "bluesky";

/// One scraped post. Field order is the raw dataset's column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    pub author: String,
    pub author_display_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub uri: Option<String>,
    pub reply_count: Option<u32>,
    pub repost_count: Option<u32>,
    pub quote_count: Option<u32>,
    pub like_count: Option<u32>,
    pub embed_type: Option<String>,
    pub language: Option<String>,
    pub platform: String,
}

/// Top label and its confidence for one post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: String,
    pub confidence: f32,
}

/// A post with its sentiment and funnel stage attached.
///
/// Kept flat (no `#[serde(flatten)]`) because the csv crate cannot round-trip
/// flattened structs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPost {
    pub id: String,
    pub text: String,
    pub author: String,
    pub author_display_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub uri: Option<String>,
    pub reply_count: Option<u32>,
    pub repost_count: Option<u32>,
    pub quote_count: Option<u32>,
    pub like_count: Option<u32>,
    pub embed_type: Option<String>,
    pub language: Option<String>,
    pub platform: String,
    pub sentiment_label: String,
    pub sentiment_confidence: f32,
    pub funnel_stage: FunnelStage,
}

impl LabeledPost {
    #[must_use]
    pub fn new(post: Post, sentiment: SentimentResult, stage: FunnelStage) -> Self {
        Self {
            id: post.id,
            text: post.text,
            author: post.author,
            author_display_name: post.author_display_name,
            timestamp: post.timestamp,
            query: post.query,
            uri: post.uri,
            reply_count: post.reply_count,
            repost_count: post.repost_count,
            quote_count: post.quote_count,
            like_count: post.like_count,
            embed_type: post.embed_type,
            language: post.language,
            platform: post.platform,
            sentiment_label: sentiment.label,
            sentiment_confidence: sentiment.confidence,
            funnel_stage: stage,
        }
    }
}

/// Stable identifier for a post.
///
/// Hashes the post URI when present, otherwise author, timestamp and text, so
/// re-scraping the same source yields the same ids.
#[must_use]
pub fn post_id(uri: Option<&str>, author: &str, timestamp: &DateTime<Utc>, text: &str) -> String {
    let mut hasher = Sha256::new();
    match uri {
        Some(uri) if !uri.is_empty() => hasher.update(uri.as_bytes()),
        _ => {
            hasher.update(author.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(timestamp.to_rfc3339().as_bytes());
            hasher.update(b"\x1f");
            hasher.update(text.as_bytes());
        }
    }
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Default dataset name for a query: `bsky_` plus its lowercase ASCII
/// alphanumerics (`"trekking poles"` → `bsky_trekkingpoles`).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidQuery`] when the query has no alphanumeric
/// characters to build a name from.
pub fn default_save_name(query: &str) -> Result<String, ConfigError> {
    let slug: String = query
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if slug.is_empty() {
        return Err(ConfigError::InvalidQuery {
            query: query.to_string(),
            reason: "query must contain at least one ASCII letter or digit".to_string(),
        });
    }

    Ok(format!("bsky_{slug}"))
}
