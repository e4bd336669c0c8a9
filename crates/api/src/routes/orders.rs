//! Checkout and order administration.

use std::sync::Arc;

use axum::extract::{Path, State};
use common::OrderId;
use domain::{Order, OrderStatus, Store};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{AdminUser, ApiJson, AuthUser, invalid_id};
use crate::response::{Envelope, OrderView};

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// Resolves line products, and the ordering users when `with_users` is set.
async fn order_views<S: Store>(
    state: &AppState<S>,
    orders: &[Order],
    with_users: bool,
) -> Result<Vec<OrderView>, ApiError> {
    let products = state
        .catalog
        .products_by_ids(orders.iter().flat_map(|o| o.lines().iter().map(|l| l.product_id)).collect::<Vec<_>>())
        .await?;
    let users = if with_users {
        state.auth.users_by_ids(orders.iter().map(Order::owner)).await?
    } else {
        Default::default()
    };

    Ok(orders
        .iter()
        .map(|o| OrderView::new(o, &products).with_user(users.get(&o.owner())))
        .collect())
}

async fn order_view<S: Store>(state: &AppState<S>, order: &Order) -> Result<OrderView, ApiError> {
    let products = state
        .catalog
        .products_by_ids(order.lines().iter().map(|l| l.product_id).collect::<Vec<_>>())
        .await?;
    Ok(OrderView::new(order, &products))
}

/// POST /api/orders: turn the caller's cart into a pending order.
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn place<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<PlaceOrderRequest>,
) -> Result<Envelope, ApiError> {
    let order = state
        .orders
        .place_order(user.identity.user_id, &req.address, &req.phone)
        .await?;
    Envelope::ok().with("order", order_view(&state, &order).await?)
}

/// GET /api/orders/my: newest first.
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn list_mine<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Envelope, ApiError> {
    let orders = state.orders.list_for_owner(user.identity.user_id).await?;
    let views = order_views(&state, &orders, false).await?;
    Envelope::ok().with("orders", views)
}

/// GET /api/orders: every order with its customer, admins only.
#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id))]
pub async fn list_all<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
) -> Result<Envelope, ApiError> {
    let orders = state.orders.list_all().await?;
    let views = order_views(&state, &orders, true).await?;
    Envelope::ok().with("orders", views)
}

/// PATCH /api/orders/{id}/status
#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id, order_id = %id))]
pub async fn set_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Envelope, ApiError> {
    let id = OrderId::parse(&id).map_err(invalid_id)?;
    let status: OrderStatus = req.status.trim().to_lowercase().parse()?;

    let order = state.orders.set_status(id, status).await?;
    Envelope::ok().with("order", order_view(&state, &order).await?)
}
