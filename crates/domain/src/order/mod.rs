//! Orders placed from a cart.

mod service;
mod status;

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::error::DomainError;
use crate::money::Money;

pub use service::OrderService;
pub use status::OrderStatus;

/// A product entry copied verbatim from a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// The cart's price snapshot, not the catalog price at order time.
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns the total price for this line.
    pub fn line_total(&self) -> Money {
        self.unit_price.saturating_multiply(self.quantity)
    }
}

/// Delivery details supplied when placing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingDetails {
    pub address: String,
    pub phone: String,
}

impl ShippingDetails {
    /// Trims both fields and rejects blank ones.
    pub fn new(address: &str, phone: &str) -> Result<Self, DomainError> {
        let address = address.trim();
        let phone = phone.trim();
        if address.is_empty() {
            return Err(DomainError::invalid("Address is required"));
        }
        if phone.is_empty() {
            return Err(DomainError::invalid("Phone is required"));
        }
        Ok(Self {
            address: address.to_string(),
            phone: phone.to_string(),
        })
    }
}

/// An order record.
///
/// Lines, total and shipping details are fixed at creation; only the status
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    owner: UserId,
    lines: Vec<OrderLine>,
    total: Money,
    address: String,
    phone: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Snapshots a non-empty cart into a new pending order.
    pub fn from_cart(cart: &Cart, shipping: ShippingDetails) -> Result<Self, DomainError> {
        if cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let lines = cart
            .lines()
            .iter()
            .map(|line| OrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();

        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            owner: cart.owner(),
            lines,
            total: cart.total(),
            address: shipping.address,
            phone: shipping.phone,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds an order from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: OrderId,
        owner: UserId,
        lines: Vec<OrderLine>,
        total: Money,
        address: String,
        phone: String,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            lines,
            total,
            address,
            phone,
            status,
            created_at,
            updated_at,
        }
    }

    /// Moves the order to `next`, enforcing the forward-only lifecycle.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        if self.status != next {
            self.status = next;
            self.updated_at = Utc::now();
        }
        Ok(())
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
