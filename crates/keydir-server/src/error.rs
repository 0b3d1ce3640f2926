use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keydir_types::KeydirError;
use serde_json::json;

/// Boundary error wrapper that maps engine errors to HTTP responses.
///
/// Decode and validation failures are the caller's fault; storage and
/// signing faults are ours and surface as unsigned 500s; an error body is
/// never labeled as a signed attestation.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Keydir(#[from] KeydirError),
}

impl IntoResponse for DirectoryError {
    fn into_response(self) -> Response {
        let DirectoryError::Keydir(inner) = &self;
        let (status, message) = match inner {
            KeydirError::InvalidLength => (StatusCode::BAD_REQUEST, "upload length invalid"),
            KeydirError::InvalidEncoding(_) => (StatusCode::BAD_REQUEST, "invalid key encoding"),
            KeydirError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "key bundle not valid for account")
            }
            KeydirError::Conflict => (StatusCode::CONFLICT, "account already registered"),
            KeydirError::NotFound(_) => (StatusCode::NOT_FOUND, "not found"),
            KeydirError::Storage(_)
            | KeydirError::Signing(_)
            | KeydirError::Serialization(_)
            | KeydirError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        };

        let body = json!({
            "error": message,
            "detail": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
