use axum::{
    extract::{Query, State},
    Extension, Json,
};
use ltl_core::analytics::{
    cumulative_stage_counts, filter_posts, weekly_conversions, weekly_stage_counts,
    ConversionRate, WeeklyStageCounts,
};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ViewParams};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(super) enum WeeklyMode {
    #[default]
    Counts,
    Cumulative,
}

#[derive(Debug, Deserialize)]
pub(super) struct WeeklyParams {
    pub mode: Option<WeeklyMode>,
    pub stage: Option<String>,
    pub emotion: Option<String>,
    pub author: Option<String>,
}

pub(super) async fn weekly(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<WeeklyParams>,
) -> Result<Json<ApiResponse<Vec<WeeklyStageCounts>>>, ApiError> {
    let filter = ViewParams {
        stage: params.stage,
        emotion: params.emotion,
        author: params.author,
        ..ViewParams::default()
    }
    .to_filter(&req_id)?;

    let store = state.dataset.read().await;
    let counts = weekly_stage_counts(filter_posts(&store.rows, &filter));
    let data = match params.mode.unwrap_or_default() {
        WeeklyMode::Counts => counts,
        WeeklyMode::Cumulative => cumulative_stage_counts(&counts),
    };
    Ok(ApiResponse::ok(req_id, data))
}

pub(super) async fn conversions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ViewParams>,
) -> Result<Json<ApiResponse<Vec<ConversionRate>>>, ApiError> {
    let filter = params.to_filter(&req_id)?;
    let store = state.dataset.read().await;
    let weekly = weekly_stage_counts(filter_posts(&store.rows, &filter));
    Ok(ApiResponse::ok(req_id, weekly_conversions(&weekly)))
}
