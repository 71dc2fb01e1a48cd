//! Typeahead search and overview endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use livith_common::api::ApiResponse;

use crate::error::DashResult;
use crate::search::{self, SearchParams};
use crate::stats::{self, Overview};
use crate::store::Record;
use crate::AppState;

/// GET /dashboard/search?type=&q=
pub async fn search_records(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> DashResult<Json<ApiResponse<Vec<Record>>>> {
    let results = search::search(state.store.as_ref(), &params).await?;
    Ok(Json(ApiResponse::ok(results)))
}

/// GET /dashboard/stats
pub async fn get_stats(State(state): State<AppState>) -> DashResult<Json<ApiResponse<Overview>>> {
    let overview = stats::overview(state.store.as_ref()).await?;
    Ok(Json(ApiResponse::ok(overview)))
}
