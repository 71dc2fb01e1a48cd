//! Shared API response envelope
//!
//! Every dashboard endpoint answers with `{success, data?, error?}`.

use serde::{Deserialize, Serialize};

/// JSON envelope for dashboard responses
///
/// # Examples
///
/// ```
/// use livith_common::api::types::ApiResponse;
///
/// let ok = ApiResponse::ok(42);
/// assert!(ok.success);
///
/// let err: ApiResponse<()> = ApiResponse::err("Unknown table: foo");
/// assert_eq!(err.error.as_deref(), Some("Unknown table: foo"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed response carrying a message
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
