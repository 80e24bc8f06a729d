mod funnel;
mod personas;
mod posts;
mod queries;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use ltl_core::analytics::PostFilter;
use ltl_core::{AppConfig, FunnelStage};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};
use crate::store::DatasetStore;

#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<RwLock<DatasetStore>>,
    pub config: Arc<AppConfig>,
    /// Held while a custom query runs; only one runs at a time.
    pub query_lock: Arc<Mutex<()>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, dataset: DatasetStore) -> Self {
        Self {
            dataset: Arc::new(RwLock::new(dataset)),
            config: Arc::new(config),
            query_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    posts: usize,
    dataset: Option<String>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn ok(req_id: RequestId, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(req_id.0),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Query parameters shared by the dashboard views.
///
/// `stage` and `emotion` take comma-separated lists.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ViewParams {
    pub stage: Option<String>,
    pub emotion: Option<String>,
    pub platform: Option<String>,
    pub author: Option<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub limit: Option<usize>,
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

impl ViewParams {
    pub(super) fn to_filter(&self, req_id: &RequestId) -> Result<PostFilter, ApiError> {
        let stages = split_list(self.stage.as_deref())
            .iter()
            .map(|s| s.parse::<FunnelStage>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e))?;

        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                return Err(ApiError::new(
                    req_id.0.clone(),
                    "validation_error",
                    "since must not be after until",
                ));
            }
        }

        Ok(PostFilter {
            stages,
            emotions: split_list(self.emotion.as_deref()),
            platforms: split_list(self.platform.as_deref()),
            author: self
                .author
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(ToOwned::to_owned),
            since: self.since,
            until: self.until,
        })
    }
}

pub(super) fn normalize_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(50).clamp(1, 500)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/posts", get(posts::list_posts))
        .route("/api/v1/posts/sample", get(posts::sample_posts))
        .route("/api/v1/funnel/weekly", get(funnel::weekly))
        .route("/api/v1/funnel/conversions", get(funnel::conversions))
        .route("/api/v1/personas", get(personas::list_personas))
        .route(
            "/api/v1/personas/{handle}/journey",
            get(personas::persona_journey),
        )
        .route("/api/v1/queries", post(queries::run_query))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

#[must_use]
pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let store = state.dataset.read().await;
    ApiResponse::ok(
        req_id,
        HealthData {
            status: "ok",
            posts: store.rows.len(),
            dataset: store.source.as_ref().map(|p| p.display().to_string()),
        },
    )
}
