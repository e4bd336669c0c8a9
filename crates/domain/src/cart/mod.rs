//! Shopping cart aggregate.
//!
//! A cart belongs to exactly one user and holds at most one line per product.
//! Its total is never adjusted incrementally: every mutation re-folds the
//! whole line set, so `total == Σ quantity × unit_price` holds after each
//! operation regardless of the mutation history.

mod service;

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

pub use service::CartService;

/// One product entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// The product identifier.
    pub product_id: ProductId,

    /// Units of the product, always at least 1.
    pub quantity: u32,

    /// Catalog price captured when the product first entered the cart.
    pub unit_price: Money,
}

impl CartLine {
    /// Returns the total price for this line (quantity * unit_price).
    ///
    /// Exact for every line held by a [`Cart`], which rejects lines whose
    /// total does not fit.
    pub fn line_total(&self) -> Money {
        self.unit_price.saturating_multiply(self.quantity)
    }
}

/// A user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    owner: UserId,
    lines: Vec<CartLine>,
    total: Money,
    /// Storage version for optimistic concurrency; 0 means never persisted.
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty, not yet persisted cart.
    pub fn empty(owner: UserId) -> Self {
        let now = Utc::now();
        Self {
            owner,
            lines: Vec::new(),
            total: Money::zero(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a cart from storage. The total is derived from `lines`.
    pub fn restore(
        owner: UserId,
        lines: Vec<CartLine>,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut cart = Self {
            owner,
            lines,
            total: Money::zero(),
            version,
            created_at,
            updated_at,
        };
        cart.total = saturating_total(&cart.lines);
        cart
    }

    /// Adds `quantity` units of a product.
    ///
    /// An existing line keeps its price snapshot and only grows in quantity;
    /// a new line snapshots `current_price`. Fails without changing the cart
    /// when the resulting total does not fit in `i64` cents.
    pub fn add(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        current_price: Money,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::invalid("Quantity must be at least 1"));
        }
        if current_price.is_negative() {
            return Err(DomainError::invalid("Price cannot be negative"));
        }

        let mut lines = self.lines.clone();
        match lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| DomainError::invalid("Quantity is too large"))?;
            }
            None => lines.push(CartLine {
                product_id,
                quantity,
                unit_price: current_price,
            }),
        }

        self.commit(lines)
    }

    /// Replaces the quantity of an existing line; zero or less removes it.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) -> Result<(), DomainError> {
        let index = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or_else(|| DomainError::not_found("Item", product_id))?;

        let mut lines = self.lines.clone();
        if quantity <= 0 {
            lines.remove(index);
        } else {
            lines[index].quantity = u32::try_from(quantity)
                .map_err(|_| DomainError::invalid("Quantity is too large"))?;
        }

        self.commit(lines)
    }

    /// Removes the line for a product. Returns false if there was none.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        let removed = self.lines.len() != before;
        self.touch();
        removed
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.touch();
    }

    /// Replaces the lines if their total fits.
    fn commit(&mut self, lines: Vec<CartLine>) -> Result<(), DomainError> {
        let total =
            checked_total(&lines).ok_or_else(|| DomainError::invalid("Cart total is too large"))?;
        self.lines = lines;
        self.total = total;
        self.updated_at = Utc::now();
        Ok(())
    }

    // Removing lines only shrinks a non-negative sum, so this never clamps.
    fn touch(&mut self) {
        self.total = saturating_total(&self.lines);
        self.updated_at = Utc::now();
    }

    /// Marks the cart as stored at `version`.
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }
}

fn checked_total(lines: &[CartLine]) -> Option<Money> {
    lines.iter().try_fold(Money::zero(), |acc, line| {
        acc.checked_add(line.unit_price.checked_multiply(line.quantity)?)
    })
}

fn saturating_total(lines: &[CartLine]) -> Money {
    lines
        .iter()
        .fold(Money::zero(), |acc, line| acc.saturating_add(line.line_total()))
}

// Query methods
impl Cart {
    /// Returns the owning user.
    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// Returns all lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns the line for a product.
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Returns the number of distinct products.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Returns the cart total.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the storage version.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_of_lines(cart: &Cart) -> i64 {
        cart.lines()
            .iter()
            .map(|l| i64::from(l.quantity) * l.unit_price.cents())
            .sum()
    }

    #[test]
    fn empty_cart_has_zero_total() {
        let cart = Cart::empty(UserId::new());
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
        assert_eq!(cart.version(), 0);
    }

    #[test]
    fn adding_same_product_merges_lines() {
        let mut cart = Cart::empty(UserId::new());
        let p = ProductId::new();
        cart.add(p, 2, Money::from_cents(1000)).unwrap();
        cart.add(p, 3, Money::from_cents(1000)).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.line(p).unwrap().quantity, 5);
        assert_eq!(cart.total().cents(), 5000);
    }

    #[test]
    fn re_adding_keeps_original_price_snapshot() {
        let mut cart = Cart::empty(UserId::new());
        let p = ProductId::new();
        cart.add(p, 1, Money::from_cents(1000)).unwrap();
        cart.add(p, 1, Money::from_cents(1500)).unwrap();

        assert_eq!(cart.line(p).unwrap().unit_price.cents(), 1000);
        assert_eq!(cart.total().cents(), 2000);
    }

    #[test]
    fn add_rejects_zero_quantity() {
        let mut cart = Cart::empty(UserId::new());
        let err = cart.add(ProductId::new(), 0, Money::from_cents(100));
        assert!(matches!(err, Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn add_rejects_overflowing_quantity() {
        let mut cart = Cart::empty(UserId::new());
        let p = ProductId::new();
        cart.add(p, u32::MAX, Money::from_cents(1)).unwrap();
        assert!(cart.add(p, 1, Money::from_cents(1)).is_err());
        assert_eq!(cart.line(p).unwrap().quantity, u32::MAX);
    }

    #[test]
    fn add_rejects_total_overflow() {
        let mut cart = Cart::empty(UserId::new());
        let yacht = ProductId::new();
        let price = Money::from_cents(i64::MAX / 2 + 1);

        let err = cart.add(yacht, 2, price).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());

        cart.add(yacht, 1, price).unwrap();
        assert!(cart.add(ProductId::new(), 1, price).is_err());
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total(), price);
    }

    #[test]
    fn set_quantity_rejects_total_overflow() {
        let mut cart = Cart::empty(UserId::new());
        let p = ProductId::new();
        cart.add(p, 1, Money::from_cents(i64::MAX / 4)).unwrap();

        assert!(cart.set_quantity(p, 5).is_err());
        assert_eq!(cart.line(p).unwrap().quantity, 1);
        assert_eq!(cart.total().cents(), i64::MAX / 4);
    }

    #[test]
    fn add_rejects_negative_price() {
        let mut cart = Cart::empty(UserId::new());
        assert!(cart.add(ProductId::new(), 1, Money::from_cents(-1)).is_err());
    }

    #[test]
    fn set_quantity_zero_removes_line() {
        let mut cart = Cart::empty(UserId::new());
        let a = ProductId::new();
        let b = ProductId::new();
        cart.add(a, 2, Money::from_cents(1000)).unwrap();
        cart.add(b, 1, Money::from_cents(500)).unwrap();
        assert_eq!(cart.total().cents(), 2500);

        cart.set_quantity(b, 0).unwrap();
        assert_eq!(cart.line_count(), 1);
        assert!(cart.line(b).is_none());
        assert_eq!(cart.total().cents(), 2000);

        // removing an absent line is a no-op
        assert!(!cart.remove(b));
        assert_eq!(cart.total().cents(), 2000);
    }

    #[test]
    fn set_quantity_negative_removes_line() {
        let mut cart = Cart::empty(UserId::new());
        let p = ProductId::new();
        cart.add(p, 4, Money::from_cents(250)).unwrap();
        cart.set_quantity(p, -1).unwrap();
        assert!(cart.is_empty());
        assert!(cart.total().is_zero());
    }

    #[test]
    fn set_quantity_missing_line_is_not_found() {
        let mut cart = Cart::empty(UserId::new());
        let err = cart.set_quantity(ProductId::new(), 2).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Item", .. }));
    }

    #[test]
    fn total_matches_lines_after_every_mutation() {
        let mut cart = Cart::empty(UserId::new());
        let products: Vec<ProductId> = (0..4).map(|_| ProductId::new()).collect();

        for (i, p) in products.iter().enumerate() {
            cart.add(*p, i as u32 + 1, Money::from_cents(100 * (i as i64 + 1)))
                .unwrap();
            assert_eq!(cart.total().cents(), sum_of_lines(&cart));
        }
        cart.set_quantity(products[1], 7).unwrap();
        assert_eq!(cart.total().cents(), sum_of_lines(&cart));
        cart.remove(products[0]);
        assert_eq!(cart.total().cents(), sum_of_lines(&cart));
        cart.set_quantity(products[2], 0).unwrap();
        assert_eq!(cart.total().cents(), sum_of_lines(&cart));
        cart.clear();
        assert_eq!(cart.total().cents(), 0);
    }

    #[test]
    fn restore_derives_total_from_lines() {
        let p = ProductId::new();
        let lines = vec![CartLine {
            product_id: p,
            quantity: 3,
            unit_price: Money::from_cents(700),
        }];
        let now = Utc::now();
        let cart = Cart::restore(UserId::new(), lines, 4, now, now);
        assert_eq!(cart.total().cents(), 2100);
        assert_eq!(cart.version(), 4);
    }
}
