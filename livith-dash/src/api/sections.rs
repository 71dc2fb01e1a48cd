//! Home/search section endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use livith_common::api::ApiResponse;
use tracing::info;

use crate::error::{DashError, DashResult};
use crate::sections::{self, SectionDetail, SectionKind, SyncReport};
use crate::AppState;

/// GET /dashboard/sections/:kind/:id
pub async fn get_section(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> DashResult<Json<ApiResponse<SectionDetail>>> {
    let kind: SectionKind = kind.parse()?;
    let id: i64 = id
        .parse()
        .map_err(|_| DashError::Validation(format!("Invalid ID: {}", id)))?;

    let detail = sections::section_detail(state.store.as_ref(), kind, id).await?;
    Ok(Json(ApiResponse::ok(detail)))
}

/// POST /dashboard/sync-sections
pub async fn sync_sections(
    State(state): State<AppState>,
) -> DashResult<Json<ApiResponse<SyncReport>>> {
    let report = sections::sync_recent_sections(state.store.as_ref()).await?;
    info!(
        "Sections synced (home: {}, search: {})",
        report.home_section_updated, report.search_section_updated
    );
    Ok(Json(ApiResponse::ok(report)))
}
