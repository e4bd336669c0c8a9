//! Order service: cart checkout and order administration.

use chrono::Utc;
use common::{OrderId, UserId};

use crate::error::DomainError;
use crate::ports::Store;

use super::{Order, OrderStatus, ShippingDetails};

/// Service for placing and administering orders.
#[derive(Clone)]
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Turns the owner's cart into a pending order and empties the cart.
    ///
    /// Lines are copied with their cart price snapshots; the catalog is not
    /// consulted. The order insert and the cart reset are one store
    /// operation: if the cart changed since it was read, nothing is written
    /// and the call fails with [`DomainError::Conflict`].
    #[tracing::instrument(skip(self, address, phone))]
    pub async fn place_order(
        &self,
        owner: UserId,
        address: &str,
        phone: &str,
    ) -> Result<Order, DomainError> {
        let cart = self
            .store
            .find_cart(owner)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(DomainError::EmptyCart)?;
        let shipping = ShippingDetails::new(address, phone)?;
        let order = Order::from_cart(&cart, shipping)?;

        let mut cleared = cart;
        cleared.clear();
        self.store.place_order(&order, &cleared).await?;

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("order_total_cents").record(order.total().cents() as f64);
        tracing::info!(order_id = %order.id(), total = %order.total(), "order placed");
        Ok(order)
    }

    /// Orders of one owner, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.list_orders_for_owner(owner).await?)
    }

    /// Every order, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.list_orders().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<Order, DomainError> {
        self.store
            .find_order(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", id))
    }

    /// Moves an order to a new status.
    ///
    /// Setting the current status again succeeds without a write. The write
    /// is conditional on the status the transition was checked against; if
    /// another update landed in between, the call fails with
    /// [`DomainError::Conflict`].
    #[tracing::instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, DomainError> {
        let mut order = self.get(id).await?;
        let current = order.status();
        if current == status {
            return Ok(order);
        }
        order.transition_to(status)?;

        let updated = self
            .store
            .update_order_status(id, current, status, Utc::now())
            .await?
            .ok_or_else(|| DomainError::not_found("Order", id))?;

        metrics::counter!("order_status_changes_total", "status" => status.as_str()).increment(1);
        tracing::info!(order_id = %id, status = %status, "order status changed");
        Ok(updated)
    }
}
