//! Wire types for the two XRPC endpoints the scraper calls.
//!
//! Only the fields the pipeline reads are modelled; everything else in the
//! Bluesky payloads is ignored by serde.

use serde::{Deserialize, Serialize};

/// Request body for `com.atproto.server.createSession`.
#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub identifier: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub access_jwt: String,
    pub handle: Option<String>,
    pub did: Option<String>,
}

/// One page of `app.bsky.feed.searchPosts`.
#[derive(Debug, Deserialize)]
pub struct SearchPostsResponse {
    #[serde(default)]
    pub posts: Vec<PostView>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: String,
    pub author: ProfileView,
    pub record: PostRecord,
    pub indexed_at: Option<String>,
    pub reply_count: Option<u32>,
    pub repost_count: Option<u32>,
    pub quote_count: Option<u32>,
    pub like_count: Option<u32>,
    pub embed: Option<EmbedView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub handle: String,
    pub display_name: Option<String>,
}

/// The `app.bsky.feed.post` record embedded in a post view.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub text: String,
    pub created_at: Option<String>,
    pub langs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedView {
    #[serde(rename = "$type")]
    pub kind: Option<String>,
}
