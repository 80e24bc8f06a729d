//! HTTP client for the Bluesky XRPC API.
//!
//! Wraps `reqwest` with session creation and cursor-paginated post search.
//! Transient failures are surfaced as-is; there is no retry layer.

use std::time::Duration;

use ltl_core::Credentials;
use reqwest::{Client, StatusCode, Url};

use crate::error::ScraperError;
use crate::types::{CreateSessionRequest, CreateSessionResponse, PostView, SearchPostsResponse};

const DEFAULT_BASE_URL: &str = "https://bsky.social/";
const CREATE_SESSION: &str = "xrpc/com.atproto.server.createSession";
const SEARCH_POSTS: &str = "xrpc/app.bsky.feed.searchPosts";

/// Largest page `searchPosts` accepts.
pub const MAX_PAGE_SIZE: usize = 100;

/// Upper bound on pages per search, guarding against a cursor that never ends.
pub const MAX_PAGES: usize = 500;

/// An authenticated Bluesky session.
#[derive(Clone)]
pub struct Session {
    access_jwt: String,
    pub handle: Option<String>,
    pub did: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_jwt", &"[redacted]")
            .field("handle", &self.handle)
            .field("did", &self.did)
            .finish()
    }
}

impl Session {
    /// Wrap an existing access token.
    #[must_use]
    pub fn from_token(access_jwt: impl Into<String>) -> Self {
        Self {
            access_jwt: access_jwt.into(),
            handle: None,
            did: None,
        }
    }
}

/// Client for the Bluesky XRPC API.
///
/// Use [`BlueskyClient::new`] for production or
/// [`BlueskyClient::with_base_url`] to point at a mock server in tests.
pub struct BlueskyClient {
    client: Client,
    base_url: Url,
}

impl BlueskyClient {
    /// Creates a client pointed at `https://bsky.social`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (PDS host or wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the client cannot be built, or
    /// [`ScraperError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ScraperError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ScraperError> {
        self.base_url
            .join(path)
            .map_err(|e| ScraperError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Logs in with an app password.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Auth`] on any non-2xx response.
    /// - [`ScraperError::Http`] on network failure.
    /// - [`ScraperError::Deserialize`] if the session payload is malformed.
    pub async fn create_session(&self, creds: &Credentials) -> Result<Session, ScraperError> {
        let url = self.endpoint(CREATE_SESSION)?;
        let response = self
            .client
            .post(url)
            .json(&CreateSessionRequest {
                identifier: &creds.identifier,
                password: &creds.app_password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ScraperError::Auth {
                status: status.as_u16(),
                message: truncate_message(&message),
            });
        }

        let body = response.text().await?;
        let parsed: CreateSessionResponse =
            serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
                context: "createSession".to_owned(),
                source: e,
            })?;

        tracing::info!(handle = ?parsed.handle, "bluesky session created");

        Ok(Session {
            access_jwt: parsed.access_jwt,
            handle: parsed.handle,
            did: parsed.did,
        })
    }

    /// Fetches a single page of search results.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`] on HTTP 429.
    /// - [`ScraperError::Auth`] on HTTP 401.
    /// - [`ScraperError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ScraperError::Deserialize`] if the page cannot be parsed.
    pub async fn search_page(
        &self,
        session: &Session,
        query: &str,
        limit: usize,
        cursor: Option<&str>,
        lang: Option<&str>,
    ) -> Result<SearchPostsResponse, ScraperError> {
        let url = self.endpoint(SEARCH_POSTS)?;
        let limit = limit.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut params: Vec<(&str, &str)> = vec![("q", query), ("limit", &limit)];
        if let Some(c) = cursor {
            params.push(("cursor", c));
        }
        if let Some(l) = lang {
            params.push(("lang", l));
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(&session.access_jwt)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(ScraperError::RateLimited { retry_after_secs });
        }
        if status == StatusCode::UNAUTHORIZED {
            let message = response.text().await.unwrap_or_default();
            return Err(ScraperError::Auth {
                status: status.as_u16(),
                message: truncate_message(&message),
            });
        }
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                context: format!("searchPosts(q={query})"),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
            context: format!("searchPosts(q={query})"),
            source: e,
        })
    }

    /// Starts a page-at-a-time search.
    #[must_use]
    pub fn pager<'a>(
        &'a self,
        session: &'a Session,
        query: &'a str,
        lang: Option<&'a str>,
    ) -> PostPager<'a> {
        PostPager {
            client: self,
            session,
            query,
            lang,
            cursor: None,
            pages: 0,
            exhausted: false,
        }
    }

    /// Collects up to `n` posts for `query`.
    ///
    /// Stops early when the cursor runs out, a page comes back empty, or
    /// [`MAX_PAGES`] is reached. Returning fewer than `n` is not an error.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`Self::search_page`].
    pub async fn search_posts(
        &self,
        session: &Session,
        query: &str,
        n: usize,
        lang: Option<&str>,
    ) -> Result<Vec<PostView>, ScraperError> {
        let mut pager = self.pager(session, query, lang);
        let mut posts = Vec::with_capacity(n.min(MAX_PAGE_SIZE * 4));

        while posts.len() < n {
            let Some(page) = pager.next_page(n - posts.len()).await? else {
                break;
            };
            posts.extend(page);
        }

        posts.truncate(n);
        tracing::debug!(
            query,
            requested = n,
            fetched = posts.len(),
            pages = pager.pages(),
            "search complete"
        );
        Ok(posts)
    }
}

/// Cursor-driven iterator over `searchPosts` pages.
pub struct PostPager<'a> {
    client: &'a BlueskyClient,
    session: &'a Session,
    query: &'a str,
    lang: Option<&'a str>,
    cursor: Option<String>,
    pages: usize,
    exhausted: bool,
}

impl PostPager<'_> {
    /// Fetches the next page, asking for at most `want` posts.
    ///
    /// Returns `Ok(None)` once the stream is exhausted: no cursor on the last
    /// page, an empty page, or the page guard tripped.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`BlueskyClient::search_page`].
    pub async fn next_page(&mut self, want: usize) -> Result<Option<Vec<PostView>>, ScraperError> {
        if self.exhausted || want == 0 {
            return Ok(None);
        }
        if self.pages >= MAX_PAGES {
            tracing::warn!(
                query = self.query,
                max_pages = MAX_PAGES,
                "page limit reached, stopping search"
            );
            self.exhausted = true;
            return Ok(None);
        }

        let limit = want.min(MAX_PAGE_SIZE);
        let page = self
            .client
            .search_page(self.session, self.query, limit, self.cursor.as_deref(), self.lang)
            .await?;
        self.pages += 1;

        self.cursor = page.cursor.filter(|c| !c.is_empty());
        if self.cursor.is_none() {
            self.exhausted = true;
        }
        if page.posts.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        let mut posts = page.posts;
        posts.truncate(want);
        Ok(Some(posts))
    }

    #[must_use]
    pub fn pages(&self) -> usize {
        self.pages
    }
}

fn truncate_message(body: &str) -> String {
    body.chars().take(200).collect()
}
