//! Maps [`KeeperError`] onto the API's stable JSON error shape (§4.G
//! "Failure: JSON error body with a stable `error` tag; never surface
//! internal exception text"), the way the teacher's handlers return
//! `(StatusCode, Json(json!({"error": ...})))` (feels-indexer
//! `src/api/handlers.rs`), generalized into a single `IntoResponse` type
//! instead of repeating the pattern at every call site.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use keeper_types::KeeperError;
use serde_json::json;

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<KeeperError> for ApiError {
    fn from(err: KeeperError) -> Self {
        let status = match &err {
            KeeperError::NotFound(_) => StatusCode::NOT_FOUND,
            KeeperError::InvalidParameter { .. } | KeeperError::InvalidConfig { .. } => {
                StatusCode::BAD_REQUEST
            }
            KeeperError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // §4.G: never surface internal exception text. NotFound/InvalidParameter
        // are safe to echo back since their Display is just the rejected input.
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "internal error".to_string(),
            _ => err.to_string(),
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Parse a `solana_program::pubkey::Pubkey` from a query/path string,
/// rejecting malformed input with a 400 rather than panicking.
pub fn parse_pubkey(raw: &str) -> Result<solana_program::pubkey::Pubkey, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("invalid address: {raw}")))
}
