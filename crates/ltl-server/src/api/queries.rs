use axum::{extract::State, Extension, Json};
use chrono::NaiveDate;
use ltl_core::Credentials;
use ltl_scraper::ScraperError;
use ltl_sentiment::SentimentError;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;
use crate::runner::{run_query as run_pipeline, QueryError, QueryRun};
use crate::store::DatasetStore;

use super::{ApiError, ApiResponse, AppState};

const DEFAULT_QUERY_POSTS: usize = 1000;

#[derive(Debug, Deserialize)]
pub(super) struct QueryRequest {
    pub query: String,
    pub n_posts: Option<usize>,
    /// Inline credentials; both must be set or the credentials file is used.
    pub identifier: Option<String>,
    pub app_password: Option<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub save_as: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct QueryRunData {
    pub query: String,
    pub raw_dataset: String,
    pub labeled_dataset: String,
    pub scraped: usize,
    pub retained: usize,
    pub suppressed: usize,
}

fn resolve_credentials(
    state: &AppState,
    body: &QueryRequest,
) -> Result<Credentials, ltl_core::ConfigError> {
    match (body.identifier.as_deref(), body.app_password.as_deref()) {
        (Some(id), Some(pw)) if !id.trim().is_empty() && !pw.trim().is_empty() => {
            Credentials::new(id, pw)
        }
        _ => Credentials::load(&state.config.auth_file),
    }
}

fn map_query_error(request_id: String, error: &QueryError) -> ApiError {
    let code = match error {
        QueryError::Config(_) => "validation_error",
        QueryError::Scraper(ScraperError::Auth { .. }) => "unauthorized",
        QueryError::Scraper(ScraperError::RateLimited { .. }) => "rate_limited",
        QueryError::Scraper(ScraperError::Http(_) | ScraperError::UnexpectedStatus { .. })
        | QueryError::Sentiment(SentimentError::Classifier(_)) => "upstream_error",
        QueryError::Scraper(_) | QueryError::Sentiment(_) => "internal_error",
    };
    tracing::error!(error = %error, code, "custom query failed");
    ApiError::new(request_id, code, error.to_string())
}

/// Scrape and classify a new query, then serve its rows.
pub(super) async fn run_query(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<QueryRequest>,
) -> Result<Json<ApiResponse<QueryRunData>>, ApiError> {
    let n_posts = body.n_posts.unwrap_or(DEFAULT_QUERY_POSTS);
    if body.query.trim().is_empty() {
        return Err(ApiError::new(req_id.0, "validation_error", "query must not be empty"));
    }
    if n_posts == 0 {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "n_posts must be a positive integer",
        ));
    }

    let Ok(_guard) = state.query_lock.try_lock() else {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "another query is already running",
        ));
    };

    let credentials = resolve_credentials(&state, &body)
        .map_err(|e| map_query_error(req_id.0.clone(), &QueryError::Config(e)))?;

    let run = QueryRun {
        query: body.query.trim().to_string(),
        n_posts,
        credentials,
        since: body.since,
        until: body.until,
        save_as: body.save_as,
    };

    let outcome = run_pipeline(&state.config, &run)
        .await
        .map_err(|e| map_query_error(req_id.0.clone(), &e))?;

    let data = QueryRunData {
        query: run.query,
        raw_dataset: outcome.raw_path.display().to_string(),
        labeled_dataset: outcome.labeled_path.display().to_string(),
        scraped: outcome.scraped,
        retained: outcome.stats.retained,
        suppressed: outcome.stats.suppressed,
    };

    *state.dataset.write().await =
        DatasetStore::from_rows(Some(outcome.labeled_path), outcome.rows);

    Ok(ApiResponse::ok(req_id, data))
}
