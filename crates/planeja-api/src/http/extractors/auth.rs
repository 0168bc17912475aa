//! Bearer-token extractor.
//!
//! Handlers that take [`AuthSubject`] require a valid access token; the
//! extractor rejects with 401 before the handler body runs.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use planeja_core::auth::service::TokenService;
use planeja_types::error::AuthError;
use planeja_types::identity::AccessClaims;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::state::AppState;

/// The verified claims of the calling subject.
#[derive(Debug, Clone)]
pub struct AuthSubject {
    pub claims: AccessClaims,
}

impl AuthSubject {
    pub fn subject_id(&self) -> Uuid {
        self.claims.sub
    }
}

impl FromRequestParts<AppState> for AuthSubject {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Auth(AuthError::Token("missing bearer token".to_string())))?;

        let claims = state.signer.verify_access(token)?;
        Ok(AuthSubject { claims })
    }
}
