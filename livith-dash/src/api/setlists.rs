//! Setlist composer endpoint

use axum::{extract::State, Json};
use livith_common::api::ApiResponse;
use tracing::info;

use crate::composer::{self, ComposedSetlist, CreateSetlistRequest};
use crate::error::DashResult;
use crate::AppState;

/// POST /dashboard/create-setlist
pub async fn create_setlist(
    State(state): State<AppState>,
    Json(request): Json<CreateSetlistRequest>,
) -> DashResult<Json<ApiResponse<ComposedSetlist>>> {
    let composed = composer::compose(state.store.as_ref(), &request).await?;
    info!(
        "Setlist composed: {} songs ({} new)",
        composed.total_songs, composed.songs_created
    );
    Ok(Json(ApiResponse::ok(composed)))
}
