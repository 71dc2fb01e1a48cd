//! Draft and save endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use livith_common::api::ApiResponse;
use tracing::debug;

use crate::error::DashResult;
use crate::row::ChangeSet;
use crate::save::{self, SaveOutcome};
use crate::AppState;

/// GET /dashboard/draft
pub async fn get_draft(State(state): State<AppState>) -> DashResult<Json<ApiResponse<ChangeSet>>> {
    let draft = state.drafts.load().await?;
    Ok(Json(ApiResponse::ok(draft)))
}

/// PUT /dashboard/draft
pub async fn put_draft(
    State(state): State<AppState>,
    Json(changes): Json<ChangeSet>,
) -> DashResult<Json<ApiResponse<ChangeSet>>> {
    state.drafts.save(&changes).await?;
    Ok(Json(ApiResponse::ok(changes)))
}

/// DELETE /dashboard/draft
pub async fn delete_draft(State(state): State<AppState>) -> DashResult<Json<ApiResponse<bool>>> {
    state.drafts.clear().await?;
    Ok(Json(ApiResponse::ok(true)))
}

/// POST /dashboard/save
///
/// Saves the ChangeSet in the body, or the stored draft when the body is
/// empty. A partial save answers 500 with the report as `data` and the
/// failure summary as `error`.
pub async fn save_draft(State(state): State<AppState>, body: Bytes) -> DashResult<Response> {
    let changes: ChangeSet = if body.iter().all(u8::is_ascii_whitespace) {
        debug!("Saving stored draft");
        state.drafts.load().await?
    } else {
        serde_json::from_slice(&body)?
    };

    let outcome = save::save_changes(state.store.as_ref(), state.drafts.as_ref(), &changes).await?;

    Ok(match outcome {
        SaveOutcome::Saved { .. } => Json(ApiResponse::ok(outcome)).into_response(),
        SaveOutcome::Partial { report } => {
            let body = ApiResponse {
                success: false,
                error: Some(report.summary()),
                data: Some(report),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    })
}
