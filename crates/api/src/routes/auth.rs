//! Registration, login, token refresh and logout.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use domain::Store;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, AuthUser};
use crate::response::{Envelope, UserView};

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

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// POST /api/auth/register: create a customer account and sign it in.
#[tracing::instrument(skip_all)]
pub async fn register<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Envelope, ApiError> {
    let (user, tokens) = state
        .auth
        .register(&req.name, &req.email, &req.password)
        .await?;

    Envelope::ok()
        .with("user", UserView::from(&user))?
        .with("tokens", tokens)
}

/// POST /api/auth/login
#[tracing::instrument(skip_all)]
pub async fn login<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Envelope, ApiError> {
    let (user, tokens) = state.auth.login(&req.email, &req.password).await?;

    Envelope::ok()
        .with("user", UserView::from(&user))?
        .with("tokens", tokens)
}

/// POST /api/auth/refresh: trade a refresh token for a new pair.
#[tracing::instrument(skip_all)]
pub async fn refresh<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Envelope, ApiError> {
    let tokens = state.auth.refresh(&req.refresh_token).await?;
    Envelope::ok().with("tokens", tokens)
}

/// POST /api/auth/logout: revoke the presented access token and, when
/// supplied, the matching refresh token.
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn logout<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Envelope, ApiError> {
    // The body is optional on logout.
    let req: LogoutRequest = if body.is_empty() {
        LogoutRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    state
        .auth
        .logout(&user.token, req.refresh_token.as_deref())
        .await?;

    Ok(Envelope::ok().message("Logged out"))
}
