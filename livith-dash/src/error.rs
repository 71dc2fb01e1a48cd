//! Error types for livith-dash
//!
//! One enum covers store, workflow and HTTP failures. Handlers return
//! `DashResult<T>`; `IntoResponse` maps each variant to a status code and the
//! `{ "success": false, "error": msg }` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use livith_common::api::ApiResponse;
use livith_common::UnknownTable;
use thiserror::Error;

/// Dashboard error type
#[derive(Debug, Error)]
pub enum DashError {
    /// Missing or malformed input (400)
    #[error("{0}")]
    Validation(String),

    /// Referenced record does not exist (404)
    #[error("{0}")]
    NotFound(String),

    /// Table tag outside the catalog (400)
    #[error(transparent)]
    UnknownTable(#[from] UnknownTable),

    /// Unique / foreign key / NOT NULL / CHECK violation (409)
    #[error("{0}")]
    Constraint(String),

    /// Any other storage failure (500)
    #[error("{0}")]
    Persistence(String),

    /// Missing or invalid session, wrong password (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Server misconfiguration (500)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for dashboard operations
pub type DashResult<T> = Result<T, DashError>;

impl DashError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            DashError::Validation(_) | DashError::UnknownTable(_) => StatusCode::BAD_REQUEST,
            DashError::NotFound(_) => StatusCode::NOT_FOUND,
            DashError::Constraint(_) => StatusCode::CONFLICT,
            DashError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DashError::Persistence(_) | DashError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for DashError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match err {
            sqlx::Error::RowNotFound => DashError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => DashError::Constraint(db_err.message().to_string()),
                _ => DashError::Persistence(db_err.message().to_string()),
            },
            other => DashError::Persistence(other.to_string()),
        }
    }
}

impl From<livith_common::Error> for DashError {
    fn from(err: livith_common::Error) -> Self {
        use livith_common::Error;

        match err {
            Error::Database(e) => e.into(),
            Error::Config(msg) => DashError::Config(msg),
            Error::Io(e) => DashError::Persistence(e.to_string()),
        }
    }
}

impl From<std::io::Error> for DashError {
    fn from(err: std::io::Error) -> Self {
        DashError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for DashError {
    fn from(err: serde_json::Error) -> Self {
        DashError::Validation(format!("Invalid JSON: {}", err))
    }
}

impl IntoResponse for DashError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(ApiResponse::<()>::err(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(DashError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(DashError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            DashError::UnknownTable(UnknownTable("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(DashError::Constraint("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(DashError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            DashError::Persistence("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_common_error_mapping() {
        let err: DashError = livith_common::Error::Config("bad bind".into()).into();
        assert!(matches!(err, DashError::Config(ref m) if m == "bad bind"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: DashError = livith_common::Error::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, DashError::NotFound(_)));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            DashError::from(sqlx::Error::RowNotFound),
            DashError::NotFound(_)
        ));
    }

    #[test]
    fn test_unknown_table_message() {
        let err: DashError = UnknownTable("nope".into()).into();
        assert_eq!(err.to_string(), "Unknown table: nope");
    }
}
