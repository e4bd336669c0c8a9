//! The caller's cart.
//!
//! The owner always comes from the bearer token, never from the body.

use std::sync::Arc;

use axum::extract::State;
use common::ProductId;
use domain::{Cart, Store};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, AuthUser, invalid_id};
use crate::response::{CartView, Envelope};

fn default_quantity() -> i64 {
    1
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeQuantityRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub product_id: String,
}

/// Resolves the products referenced by the cart's lines.
async fn cart_view<S: Store>(state: &AppState<S>, cart: &Cart) -> Result<CartView, ApiError> {
    let products = state
        .catalog
        .products_by_ids(cart.lines().iter().map(|l| l.product_id).collect::<Vec<_>>())
        .await?;
    Ok(CartView::new(cart, &products))
}

/// GET /api/cart: created empty on first access.
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Envelope, ApiError> {
    let cart = state.carts.get(user.identity.user_id).await?;
    Envelope::ok().with("cart", cart_view(&state, &cart).await?)
}

/// POST /api/cart/add: `quantity` defaults to 1.
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn add<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<AddItemRequest>,
) -> Result<Envelope, ApiError> {
    let product_id = ProductId::parse(&req.product_id).map_err(invalid_id)?;
    let cart = state
        .carts
        .add_item(user.identity.user_id, product_id, req.quantity)
        .await?;
    Envelope::ok().with("cart", cart_view(&state, &cart).await?)
}

/// POST /api/cart/change and PATCH /api/cart: zero or less removes the line.
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn change<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<ChangeQuantityRequest>,
) -> Result<Envelope, ApiError> {
    let product_id = ProductId::parse(&req.product_id).map_err(invalid_id)?;
    let cart = state
        .carts
        .set_quantity(user.identity.user_id, product_id, req.quantity)
        .await?;
    Envelope::ok().with("cart", cart_view(&state, &cart).await?)
}

#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<RemoveItemRequest>,
) -> Result<Envelope, ApiError> {
    let product_id = ProductId::parse(&req.product_id).map_err(invalid_id)?;
    let cart = state
        .carts
        .remove_item(user.identity.user_id, product_id)
        .await?;
    Envelope::ok().with("cart", cart_view(&state, &cart).await?)
}

#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn clear<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Envelope, ApiError> {
    let cart = state.carts.clear(user.identity.user_id).await?;
    Envelope::ok().with("cart", cart_view(&state, &cart).await?)
}
