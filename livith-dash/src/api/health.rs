//! Health check endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use livith_common::Table;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::error::DashResult;
use crate::AppState;

/// Health check response: status, module name, and version
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
///
/// Does not require authentication.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "livith-dash".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn table_counts(state: &AppState) -> DashResult<serde_json::Value> {
    sqlx::query("SELECT 1").execute(&state.db).await?;

    Ok(json!({
        "users": state.store.count(Table::Users, &[]).await?,
        "concerts": state.store.count(Table::Concerts, &[]).await?,
        "artists": state.store.count(Table::Artists, &[]).await?,
    }))
}

/// GET /api/health/db
pub async fn database_health(State(state): State<AppState>) -> Response {
    let timestamp = Utc::now().to_rfc3339();
    match table_counts(&state).await {
        Ok(stats) => Json(json!({
            "status": "connected",
            "timestamp": timestamp,
            "stats": stats,
        }))
        .into_response(),
        Err(e) => {
            error!("Database health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "disconnected",
                    "error": e.to_string(),
                    "timestamp": timestamp,
                })),
            )
                .into_response()
        }
    }
}

/// Build public health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
