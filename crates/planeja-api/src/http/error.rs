//! Application error type mapping to HTTP status codes and envelope format.
//!
//! Bodies are `{"success": false, "message": ...}`. Authentication and
//! ownership failures keep their stable, non-leaking messages; everything
//! repository- or hashing-shaped collapses into a generic 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use planeja_types::error::{AuthError, ChatError};

#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Chat(ChatError),
    Validation(String),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        ApiError::Chat(e)
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Auth(err) => match err {
                AuthError::EmailTaken => (StatusCode::CONFLICT, err.to_string()),
                AuthError::InvalidCredentials
                | AuthError::MissingRefreshToken
                | AuthError::InvalidRefreshToken
                | AuthError::ExpiredRefreshToken => (StatusCode::UNAUTHORIZED, err.to_string()),
                AuthError::Token(_) => {
                    (StatusCode::UNAUTHORIZED, "invalid access token".to_string())
                }
                AuthError::NotOwner => (StatusCode::FORBIDDEN, err.to_string()),
                AuthError::CredentialNotFound | AuthError::SubjectNotFound => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                AuthError::PasswordHash(_) | AuthError::Repository(_) => {
                    tracing::error!(error = %err, "internal auth failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_string(),
                    )
                }
            },
            ApiError::Chat(err) => match err {
                ChatError::ConversationNotFound => (StatusCode::NOT_FOUND, err.to_string()),
                ChatError::Repository(_) => {
                    tracing::error!(error = %err, "internal chat failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_string(),
                    )
                }
            },
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = json!({
            "success": false,
            "message": message,
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
