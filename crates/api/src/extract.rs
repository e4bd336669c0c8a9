//! Request extractors: bearer authentication and envelope-aware body and
//! query parsing.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use domain::{Identity, Store};
use serde::de::DeserializeOwned;

use crate::AppState;
use crate::error::ApiError;

/// An authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
    /// The presented access token, needed to revoke it on logout.
    pub token: String,
}

/// An authenticated caller with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Authorization required".to_string()))?;

    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Malformed authorization header".to_string()))
}

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.to_string();
        let identity = state.auth.authenticate(&token).await?;
        Ok(Self { identity, token })
    }
}

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.identity.is_admin() {
            tracing::warn!(user_id = %user.identity.user_id, "admin route refused");
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(Self(user.identity))
    }
}

/// JSON body whose rejection is rendered as a failure envelope.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string whose rejection is rendered as a failure envelope.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Maps an unparsable path id to a 400.
pub fn invalid_id(err: impl std::fmt::Display) -> ApiError {
    ApiError::BadRequest(format!("Invalid ID format: {err}"))
}
