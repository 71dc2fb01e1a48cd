//! Admin login and session middleware
//!
//! A single shared admin password. A successful login issues an opaque token
//! stored in [`Sessions`] and set as the `admin-auth` cookie; the middleware
//! admits requests carrying a live token.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use livith_common::api::{
    clear_session_cookie, generate_session_token, parse_cookie, session_cookie, verify_password,
    ApiResponse, SESSION_COOKIE, SESSION_MAX_AGE_SECS,
};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{DashError, DashResult};
use crate::AppState;

/// Live sessions: token -> expiry
#[derive(Clone, Default)]
pub struct Sessions {
    inner: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl Sessions {
    /// Start a session, returning its token
    pub async fn create(&self) -> String {
        let token = generate_session_token();
        let expires = Utc::now() + Duration::seconds(SESSION_MAX_AGE_SECS);

        let mut sessions = self.inner.write().await;
        sessions.retain(|_, expiry| *expiry > Utc::now());
        sessions.insert(token.clone(), expires);
        token
    }

    /// True if `token` names an unexpired session
    pub async fn is_valid(&self, token: &str) -> bool {
        self.inner
            .read()
            .await
            .get(token)
            .is_some_and(|expiry| *expiry > Utc::now())
    }

    pub async fn revoke(&self, token: &str) {
        self.inner.write().await.remove(token);
    }
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| parse_cookie(cookies, SESSION_COOKIE))
}

fn with_cookie<T: serde::Serialize>(body: ApiResponse<T>, cookie: String) -> DashResult<Response> {
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| DashError::Persistence(format!("Invalid cookie header: {}", e)))?;
    let mut response = Json(body).into_response();
    response.headers_mut().insert(header::SET_COOKIE, value);
    Ok(response)
}

/// Session middleware for the protected routes
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, DashError> {
    match session_token(request.headers()) {
        Some(token) if state.sessions.is_valid(token).await => Ok(next.run(request).await),
        _ => Err(DashError::Unauthorized("Unauthorized".to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> DashResult<Response> {
    let expected = state
        .admin_password
        .as_deref()
        .ok_or_else(|| DashError::Config("ADMIN_PASSWORD is not set".to_string()))?;

    if !verify_password(&request.password, expected) {
        warn!("Rejected admin login");
        return Err(DashError::Unauthorized("Invalid password".to_string()));
    }

    let token = state.sessions.create().await;
    info!("Admin logged in");
    with_cookie(ApiResponse::<()> { success: true, data: None, error: None }, session_cookie(&token))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> DashResult<Response> {
    if let Some(token) = session_token(&headers) {
        state.sessions.revoke(token).await;
    }
    with_cookie(ApiResponse::<()> { success: true, data: None, error: None }, clear_session_cookie())
}
