use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use ltl_core::analytics::{
    persona_journey as journey_for, persona_summaries, PersonaJourney, PersonaSummary,
};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct PersonasQuery {
    pub limit: Option<usize>,
}

pub(super) async fn list_personas(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PersonasQuery>,
) -> Json<ApiResponse<Vec<PersonaSummary>>> {
    let store = state.dataset.read().await;
    let mut data = persona_summaries(&store.rows);
    data.truncate(normalize_limit(query.limit));
    ApiResponse::ok(req_id, data)
}

pub(super) async fn persona_journey(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(handle): Path<String>,
) -> Result<Json<ApiResponse<PersonaJourney>>, ApiError> {
    let store = state.dataset.read().await;
    match journey_for(&store.rows, &handle) {
        Some(journey) => Ok(ApiResponse::ok(req_id, journey)),
        None => Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("no posts by '{handle}' in the current dataset"),
        )),
    }
}
