use axum::{
    extract::{Query, State},
    Extension, Json,
};
use ltl_core::analytics::{filter_posts, sample_posts as pick_sample};
use ltl_core::LabeledPost;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{normalize_limit, ApiError, ApiResponse, AppState, ViewParams};

const DEFAULT_SAMPLE: usize = 5;
const MAX_SAMPLE: usize = 100;

pub(super) async fn list_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ViewParams>,
) -> Result<Json<ApiResponse<Vec<LabeledPost>>>, ApiError> {
    let filter = params.to_filter(&req_id)?;
    let limit = normalize_limit(params.limit);

    let store = state.dataset.read().await;
    let data: Vec<LabeledPost> = filter_posts(&store.rows, &filter)
        .into_iter()
        .take(limit)
        .cloned()
        .collect();

    Ok(ApiResponse::ok(req_id, data))
}

#[derive(Debug, Deserialize)]
pub(super) struct SampleParams {
    pub n: Option<usize>,
    pub stage: Option<String>,
    pub emotion: Option<String>,
}

fn sample_rows(
    rows: &[LabeledPost],
    params: &ViewParams,
    n: usize,
    req_id: &RequestId,
) -> Result<Vec<LabeledPost>, ApiError> {
    let filter = params.to_filter(req_id)?;
    let matching = filter_posts(rows, &filter);
    let mut rng = rand::rng();
    Ok(pick_sample(&matching, n, &mut rng)
        .into_iter()
        .cloned()
        .collect())
}

pub(super) async fn sample_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SampleParams>,
) -> Result<Json<ApiResponse<Vec<LabeledPost>>>, ApiError> {
    let n = params.n.unwrap_or(DEFAULT_SAMPLE).clamp(1, MAX_SAMPLE);
    let view = ViewParams {
        stage: params.stage,
        emotion: params.emotion,
        ..ViewParams::default()
    };

    let store = state.dataset.read().await;
    let data = sample_rows(&store.rows, &view, n, &req_id)?;
    Ok(ApiResponse::ok(req_id, data))
}
