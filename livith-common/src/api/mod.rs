//! Shared HTTP API functionality
//!
//! Pure functions and types only; the dashboard wraps these with axum.

pub mod auth;
pub mod types;

pub use auth::{
    clear_session_cookie, generate_session_token, parse_cookie, session_cookie, verify_password,
    SESSION_COOKIE, SESSION_MAX_AGE_SECS,
};
pub use types::ApiResponse;
