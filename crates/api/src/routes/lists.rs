//! Favorites and the comparison list.

use std::sync::Arc;

use axum::extract::State;
use common::ProductId;
use domain::{ProductList, Store};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, AuthUser, invalid_id};
use crate::response::{self, Envelope};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub product_id: String,
}

impl ProductRequest {
    fn product_id(&self) -> Result<ProductId, ApiError> {
        ProductId::parse(&self.product_id).map_err(invalid_id)
    }
}

async fn favorites_envelope<S: Store>(
    state: &AppState<S>,
    list: &ProductList,
) -> Result<Envelope, ApiError> {
    let products = state.favorites.products(list).await?;
    Envelope::ok().with("favorites", response::products(&products))
}

async fn compare_envelope<S: Store>(
    state: &AppState<S>,
    list: &ProductList,
) -> Result<Envelope, ApiError> {
    let products = state.compare.products(list).await?;
    Envelope::ok().with("compare", response::products(&products))
}

/// GET /api/favorites
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn favorites<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Envelope, ApiError> {
    let list = state.favorites.get(user.identity.user_id).await?;
    favorites_envelope(&state, &list).await
}

/// POST /api/favorites/toggle
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn toggle_favorite<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<ProductRequest>,
) -> Result<Envelope, ApiError> {
    let list = state
        .favorites
        .toggle(user.identity.user_id, req.product_id()?)
        .await?;
    favorites_envelope(&state, &list).await
}

#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn remove_favorite<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<ProductRequest>,
) -> Result<Envelope, ApiError> {
    let list = state
        .favorites
        .remove(user.identity.user_id, req.product_id()?)
        .await?;
    favorites_envelope(&state, &list).await
}

/// GET /api/compare
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn compare<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Envelope, ApiError> {
    let list = state.compare.get(user.identity.user_id).await?;
    compare_envelope(&state, &list).await
}

/// POST /api/compare/add: at most four products.
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn add_compare<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<ProductRequest>,
) -> Result<Envelope, ApiError> {
    let list = state
        .compare
        .add(user.identity.user_id, req.product_id()?)
        .await?;
    compare_envelope(&state, &list).await
}

#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn remove_compare<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<ProductRequest>,
) -> Result<Envelope, ApiError> {
    let list = state
        .compare
        .remove(user.identity.user_id, req.product_id()?)
        .await?;
    compare_envelope(&state, &list).await
}

#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn clear_compare<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Envelope, ApiError> {
    let list = state.compare.clear(user.identity.user_id).await?;
    compare_envelope(&state, &list).await
}
