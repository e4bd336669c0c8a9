//! Cart service: read-or-create and line mutations.

use common::{ProductId, UserId};

use crate::error::DomainError;
use crate::ports::{RepositoryError, Store};

use super::Cart;

/// Service for managing user carts.
///
/// Every mutation reads the cart, applies the change in memory and writes it
/// back guarded by the version it was read at. A concurrent edit surfaces as
/// [`DomainError::Conflict`]; nothing is retried.
#[derive(Clone)]
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the owner's cart, creating an empty one on first access.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, owner: UserId) -> Result<Cart, DomainError> {
        if let Some(cart) = self.store.find_cart(owner).await? {
            return Ok(cart);
        }

        match self.store.save_cart(&Cart::empty(owner)).await {
            Ok(cart) => Ok(cart),
            // Another request created it first.
            Err(RepositoryError::VersionConflict { .. }) => self
                .store
                .find_cart(owner)
                .await?
                .ok_or_else(|| DomainError::not_found("Cart", owner)),
            Err(e) => Err(e.into()),
        }
    }

    /// Adds `quantity` units of a product at its current catalog price.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        owner: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, DomainError> {
        if quantity < 1 {
            return Err(DomainError::invalid("Quantity must be at least 1"));
        }
        let quantity =
            u32::try_from(quantity).map_err(|_| DomainError::invalid("Quantity is too large"))?;

        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", product_id))?;

        let mut cart = self.load_or_empty(owner).await?;
        cart.add(product.id, quantity, product.price)?;
        let cart = self.store.save_cart(&cart).await?;

        record_mutation("add");
        tracing::debug!(lines = cart.line_count(), total = %cart.total(), "item added to cart");
        Ok(cart)
    }

    /// Replaces the quantity of a line; zero or less removes it.
    #[tracing::instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        owner: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, DomainError> {
        let mut cart = self
            .store
            .find_cart(owner)
            .await?
            .ok_or_else(|| DomainError::not_found("Cart", owner))?;

        cart.set_quantity(product_id, quantity)?;
        let cart = self.store.save_cart(&cart).await?;

        record_mutation("set_quantity");
        Ok(cart)
    }

    /// Removes the line for a product if present.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        owner: UserId,
        product_id: ProductId,
    ) -> Result<Cart, DomainError> {
        let mut cart = self.load_or_empty(owner).await?;
        if !cart.remove(product_id) && cart.version() > 0 {
            return Ok(cart);
        }
        let cart = self.store.save_cart(&cart).await?;

        record_mutation("remove");
        Ok(cart)
    }

    /// Empties the cart unconditionally.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, owner: UserId) -> Result<Cart, DomainError> {
        let mut cart = self.load_or_empty(owner).await?;
        cart.clear();
        let cart = self.store.save_cart(&cart).await?;

        record_mutation("clear");
        Ok(cart)
    }

    async fn load_or_empty(&self, owner: UserId) -> Result<Cart, DomainError> {
        Ok(self
            .store
            .find_cart(owner)
            .await?
            .unwrap_or_else(|| Cart::empty(owner)))
    }
}

fn record_mutation(op: &'static str) {
    metrics::counter!("cart_mutations_total", "op" => op).increment(1);
}
