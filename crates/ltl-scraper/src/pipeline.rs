//! Scrape stage: search, normalize, persist.

use std::path::PathBuf;

use chrono::NaiveDate;
use ltl_core::dataset::{validate_name, write_posts};
use ltl_core::{default_save_name, raw_path, ConfigError, Credentials, Post, PostWriter, StageOutput};

use crate::client::BlueskyClient;
use crate::error::ScraperError;
use crate::normalize::{NormalizeOptions, Normalizer};

/// Inputs for one scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub query: String,
    pub n_posts: usize,
    /// Append each page to disk as it arrives and keep rows in memory.
    pub stream: bool,
    pub data_root: PathBuf,
    /// Dataset name; defaults to [`default_save_name`] of the query.
    pub save_as: Option<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub language: Option<String>,
}

impl ScrapeRequest {
    /// Name the raw and processed files are stored under.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidQuery`] if no name can be derived, or
    /// [`ConfigError::InvalidDatasetName`] if `save_as` is not a plain name.
    pub fn dataset_name(&self) -> Result<String, ConfigError> {
        match self.save_as.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                validate_name(name)?;
                Ok(name.to_string())
            }
            _ => default_save_name(&self.query),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.n_posts == 0 {
            return Err(ConfigError::InvalidPostCount);
        }
        if self.query.trim().is_empty() {
            return Err(ConfigError::InvalidQuery {
                query: self.query.clone(),
                reason: "query is empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Authenticate, search and write the raw dataset.
///
/// In batch mode the file is written once at the end. In streaming mode the
/// header is written up front and every page is appended and flushed, so the
/// file grows while the search runs. Both modes write identical rows.
///
/// Collecting fewer posts than requested is logged, not an error.
///
/// # Errors
///
/// - [`ScraperError::Config`] for a non-positive count or malformed query.
/// - [`ScraperError::Auth`] if the session cannot be created.
/// - Any HTTP or dataset error raised while paging or writing.
pub async fn scrape(
    client: &BlueskyClient,
    creds: &Credentials,
    request: &ScrapeRequest,
) -> Result<StageOutput<Post>, ScraperError> {
    request.validate()?;
    let name = request.dataset_name()?;
    let path = raw_path(&request.data_root, &name);

    let session = client.create_session(creds).await?;

    let mut normalizer = Normalizer::new(NormalizeOptions {
        query: request.query.clone(),
        language: request.language.clone(),
        since: request.since,
        until: request.until,
    });
    let mut pager = client.pager(&session, &request.query, request.language.as_deref());

    let mut writer = if request.stream {
        Some(PostWriter::create(&path)?)
    } else {
        None
    };
    let mut rows: Vec<Post> = Vec::new();

    while rows.len() < request.n_posts {
        let Some(page) = pager.next_page(request.n_posts - rows.len()).await? else {
            break;
        };
        let mut clean = normalizer.normalize_page(page);
        clean.truncate(request.n_posts - rows.len());

        if let Some(w) = writer.as_mut() {
            w.append(&clean)?;
            tracing::debug!(page = pager.pages(), written = w.written(), "appended page");
        }
        rows.extend(clean);
    }

    let stats = normalizer.stats();
    if stats.dropped() > 0 {
        tracing::info!(
            empty_text = stats.empty_text,
            bad_timestamp = stats.bad_timestamp,
            out_of_window = stats.out_of_window,
            wrong_language = stats.wrong_language,
            duplicate = stats.duplicate,
            "filtered posts during normalization"
        );
    }
    if rows.len() < request.n_posts {
        tracing::warn!(
            query = %request.query,
            requested = request.n_posts,
            collected = rows.len(),
            "search exhausted before reaching requested count"
        );
    }

    let output = match writer {
        Some(w) => {
            let (path, _) = w.finish()?;
            StageOutput::PersistedAndBuffered { path, rows }
        }
        None => {
            let count = write_posts(&path, &rows)?;
            StageOutput::Persisted { path, count }
        }
    };

    tracing::info!(path = %output.path().display(), "saved {} posts", output.len());
    Ok(output)
}
