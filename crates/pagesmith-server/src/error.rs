use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pagesmith_core::PagesmithError;

// ---------------------------------------------------------------------------
// Internal sentinel for errors with an explicit status and public message
// ---------------------------------------------------------------------------

/// Carries an HTTP status and a caller-facing message through the
/// `anyhow::Error` chain. The underlying cause is logged, never returned.
#[derive(Debug)]
struct PublicError {
    status: StatusCode,
    message: String,
}

impl std::fmt::Display for PublicError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PublicError {}

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. Bodies are always
/// `{"ok": false, "error": "..."}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn public(status: StatusCode, msg: impl Into<String>) -> Self {
        Self(
            PublicError {
                status,
                message: msg.into(),
            }
            .into(),
        )
    }

    /// 400 Bad Request.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::public(StatusCode::BAD_REQUEST, msg)
    }

    /// 500 with a fixed public message; the detail stays in the logs.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::public(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(p) = self.0.downcast_ref::<PublicError>() {
            let body = serde_json::json!({ "ok": false, "error": p.message.clone() });
            return (p.status, axum::Json(body)).into_response();
        }

        let status = match self.0.downcast_ref::<PagesmithError>() {
            Some(e) if e.is_structural() => StatusCode::UNPROCESSABLE_ENTITY,
            Some(PagesmithError::InvalidRound(_) | PagesmithError::InvalidRepoName(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "ok": false, "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
