//! Generic `/dashboard/{table}` endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use livith_common::api::ApiResponse;
use livith_common::Table;
use tracing::info;

use crate::error::{DashError, DashResult};
use crate::records::{self, ListParams, TablePage};
use crate::store::Record;
use crate::AppState;

fn parse_id(id: &str) -> DashResult<i64> {
    id.parse()
        .map_err(|_| DashError::Validation(format!("Invalid ID: {}", id)))
}

/// GET /dashboard/:table
pub async fn list_records(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<ListParams>,
) -> DashResult<Json<ApiResponse<TablePage>>> {
    let table: Table = table.parse()?;
    let page = records::list_table(state.store.as_ref(), table, &params).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// POST /dashboard/:table
pub async fn create_record(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(data): Json<Record>,
) -> DashResult<Json<ApiResponse<Record>>> {
    let table: Table = table.parse()?;
    let created = records::create_record(state.store.as_ref(), table, &data).await?;
    info!("Created {} row", table);
    Ok(Json(ApiResponse::ok(created)))
}

/// GET /dashboard/:table/:id
pub async fn get_record(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> DashResult<Json<ApiResponse<Record>>> {
    let table: Table = table.parse()?;
    let record = records::record_detail(state.store.as_ref(), table, parse_id(&id)?).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// PUT /dashboard/:table/:id
pub async fn update_record(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    Json(data): Json<Record>,
) -> DashResult<Json<ApiResponse<Record>>> {
    let table: Table = table.parse()?;
    let updated = records::update_record(state.store.as_ref(), table, parse_id(&id)?, &data).await?;
    Ok(Json(ApiResponse::ok(updated)))
}

/// DELETE /dashboard/:table/:id
pub async fn delete_record(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> DashResult<Json<ApiResponse<Record>>> {
    let table: Table = table.parse()?;
    let id = parse_id(&id)?;
    let deleted = records::delete_record(state.store.as_ref(), table, id).await?;
    info!("Deleted {} {}", table, id);
    Ok(Json(ApiResponse::ok(deleted)))
}
