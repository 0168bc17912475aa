//! Session endpoints: register, login, refresh, logout, profile, and
//! credential listing/revocation.
//!
//! The refresh secret travels exclusively in the HTTP-only cookie; response
//! bodies carry only the subject and the short-lived access token.

use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use planeja_core::auth::service::{NewRegistration, RequestContext, SessionBundle};
use planeja_types::credential::CredentialMetadata;
use planeja_types::error::AuthError;
use planeja_types::identity::Subject;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::http::cookie::{build_refresh_cookie, clear_refresh_cookie, extract_cookie};
use crate::http::error::ApiError;
use crate::http::extractors::auth::AuthSubject;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserBody {
    id: Uuid,
    name: String,
    email: String,
}

impl From<&Subject> for UserBody {
    fn from(subject: &Subject) -> Self {
        Self {
            id: subject.id,
            name: subject.name.clone(),
            email: subject.email.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialBody {
    id: Uuid,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    source_ip: Option<String>,
    user_agent: Option<String>,
}

impl From<CredentialMetadata> for CredentialBody {
    fn from(meta: CredentialMetadata) -> Self {
        Self {
            id: meta.id,
            issued_at: meta.issued_at,
            expires_at: meta.expires_at,
            source_ip: meta.source_ip,
            user_agent: meta.user_agent,
        }
    }
}

fn request_context(headers: &HeaderMap) -> RequestContext {
    let source_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    RequestContext {
        source_ip,
        user_agent,
    }
}

/// Response with the session body and the refresh cookie.
fn session_response(status: StatusCode, state: &AppState, bundle: &SessionBundle) -> Response {
    let cookie = build_refresh_cookie(&state.config.cookie, &bundle.refresh_secret);
    let body = json!({
        "success": true,
        "user": UserBody::from(&bundle.subject),
        "token": bundle.access_token,
    });

    (status, [(SET_COOKIE, cookie)], Json(body)).into_response()
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::Validation(
            "name, email and password are required".to_string(),
        ));
    }

    let bundle = state
        .session_service
        .register(
            NewRegistration {
                name: body.name.trim().to_string(),
                email: body.email.trim().to_lowercase(),
                password: body.password,
            },
            request_context(&headers),
        )
        .await?;

    Ok(session_response(StatusCode::CREATED, &state, &bundle))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let bundle = state
        .session_service
        .login(
            &body.email.trim().to_lowercase(),
            &body.password,
            request_context(&headers),
        )
        .await?;

    Ok(session_response(StatusCode::OK, &state, &bundle))
}

pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let secret = extract_cookie(&headers, &state.config.cookie.name)
        .ok_or(ApiError::Auth(AuthError::MissingRefreshToken))?;

    let bundle = state
        .session_service
        .refresh(&secret, request_context(&headers))
        .await?;

    Ok(session_response(StatusCode::OK, &state, &bundle))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(secret) = extract_cookie(&headers, &state.config.cookie.name) {
        state.session_service.logout(&secret).await?;
    }

    let cookie = clear_refresh_cookie(&state.config.cookie);
    let body = json!({ "success": true, "message": "logged out" });
    Ok((StatusCode::OK, [(SET_COOKIE, cookie)], Json(body)).into_response())
}

pub async fn me(auth: AuthSubject) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "user": {
            "id": auth.claims.sub,
            "name": auth.claims.name,
            "email": auth.claims.email,
        },
    }))
}

pub async fn list_refresh_tokens(
    State(state): State<AppState>,
    auth: AuthSubject,
) -> Result<Json<serde_json::Value>, ApiError> {
    let tokens: Vec<CredentialBody> = state
        .session_service
        .list_active(&auth.subject_id())
        .await?
        .into_iter()
        .map(CredentialBody::from)
        .collect();

    Ok(Json(json!({ "success": true, "tokens": tokens })))
}

pub async fn revoke_refresh_token(
    State(state): State<AppState>,
    auth: AuthSubject,
    Path(credential_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .session_service
        .revoke(&auth.subject_id(), &credential_id)
        .await?;

    Ok(Json(json!({ "success": true })))
}
