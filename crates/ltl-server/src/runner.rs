//! Runs a custom dashboard query through scrape and classify.

use std::path::PathBuf;

use chrono::NaiveDate;
use ltl_core::{AppConfig, ConfigError, Credentials, LabeledPost};
use ltl_scraper::{scrape, BlueskyClient, ScrapeRequest, ScraperError};
use ltl_sentiment::{
    run_classification, ClassifierInput, ClassifyOptions, ClassifyStats, SentimentError,
    TeiClassifier,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scraper(#[from] ScraperError),

    #[error(transparent)]
    Sentiment(#[from] SentimentError),
}

/// A custom query submitted from the dashboard.
#[derive(Debug, Clone)]
pub struct QueryRun {
    pub query: String,
    pub n_posts: usize,
    pub credentials: Credentials,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub save_as: Option<String>,
}

#[derive(Debug)]
pub struct QueryOutcome {
    pub raw_path: PathBuf,
    pub labeled_path: PathBuf,
    pub scraped: usize,
    pub stats: ClassifyStats,
    pub rows: Vec<LabeledPost>,
}

/// Scrape and classify in streaming mode with neutral posts suppressed.
///
/// # Errors
///
/// Returns [`QueryError`] from whichever stage fails first.
pub async fn run_query(config: &AppConfig, run: &QueryRun) -> Result<QueryOutcome, QueryError> {
    let request = ScrapeRequest {
        query: run.query.clone(),
        n_posts: run.n_posts,
        stream: true,
        data_root: config.data_root.clone(),
        save_as: run.save_as.clone(),
        since: run.since,
        until: run.until,
        language: config.search_language.clone(),
    };
    let name = request.dataset_name()?;

    let client = BlueskyClient::with_base_url(
        config.request_timeout_secs,
        &config.user_agent,
        &config.bsky_base_url,
    )?;
    let scraped = scrape(&client, &run.credentials, &request).await?;
    let raw_path = scraped.path().to_path_buf();
    let scraped_count = scraped.len();

    let model = TeiClassifier::new(
        &config.classifier_url,
        config.request_timeout_secs,
        config.classifier_api_token.clone(),
    )?;
    let options = ClassifyOptions {
        query: run.query.clone(),
        name,
        data_root: config.data_root.clone(),
        suppress_neutral: true,
        stream: true,
        batch_size: config.classifier_batch_size,
        max_text_len: config.max_text_len,
    };
    let result = run_classification(&model, ClassifierInput::from(scraped), &options).await?;
    let labeled_path = result.output.path().to_path_buf();
    let rows = result.output.into_rows().unwrap_or_default();

    tracing::info!(
        query = %run.query,
        scraped = scraped_count,
        retained = result.stats.retained,
        "custom query complete"
    );

    Ok(QueryOutcome {
        raw_path,
        labeled_path,
        scraped: scraped_count,
        stats: result.stats,
        rows,
    })
}
