//! Catalog entities: products, categories and brands.

mod query;
mod service;
mod slug;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{BrandId, CategoryId, ProductId};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::review::RatingSummary;

pub use query::{Pagination, ProductPage, ProductQuery};
pub use service::{CatalogService, RELATED_LIMIT};
pub use slug::slugify;

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Money,
    /// Pre-discount price shown struck through when the product is on sale.
    pub old_price: Option<Money>,
    pub category_id: CategoryId,
    pub brand_id: BrandId,
    pub images: Vec<String>,
    pub characteristics: BTreeMap<String, String>,
    pub in_stock: bool,
    pub quantity: u32,
    pub is_new: bool,
    pub is_sale: bool,
    /// Derived from the product's reviews; never written directly by clients.
    pub rating: RatingSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Sets the stock level, keeping `in_stock` consistent with it.
    pub fn set_stock(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.in_stock = quantity > 0;
    }
}

/// Fields required to create a product.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub old_price: Option<Money>,
    pub category_id: CategoryId,
    pub brand_id: BrandId,
    pub images: Vec<String>,
    pub characteristics: BTreeMap<String, String>,
    pub quantity: u32,
    pub is_new: bool,
    pub is_sale: bool,
}

/// Partial product update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    /// `Some(None)` clears the old price.
    pub old_price: Option<Option<Money>>,
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub images: Option<Vec<String>>,
    pub characteristics: Option<BTreeMap<String, String>>,
    pub quantity: Option<u32>,
    pub is_new: Option<bool>,
    pub is_sale: Option<bool>,
}

/// A product category, optionally nested under a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Partial category update.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub parent_id: Option<Option<CategoryId>>,
    pub image: Option<Option<String>>,
}

/// A product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Partial brand update.
#[derive(Debug, Clone, Default)]
pub struct BrandPatch {
    pub name: Option<String>,
    pub image: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_stock_tracks_availability() {
        let mut product = crate::test_support::product("Drill", 1000);
        product.set_stock(0);
        assert!(!product.in_stock);
        product.set_stock(3);
        assert!(product.in_stock);
        assert_eq!(product.quantity, 3);
    }
}
