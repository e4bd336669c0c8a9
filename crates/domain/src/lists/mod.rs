//! Per-user product lists: favorites and the comparison list.

mod service;

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

pub use service::{CompareService, FavoritesService};

/// Maximum number of products a comparison list may hold.
pub const COMPARE_LIMIT: usize = 4;

/// Which list a [`ProductList`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Favorites,
    Compare,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Favorites => "favorites",
            ListKind::Compare => "compare",
        }
    }
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, duplicate-free set of products owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductList {
    pub owner: UserId,
    pub kind: ListKind,
    pub products: Vec<ProductId>,
    pub updated_at: DateTime<Utc>,
}

impl ProductList {
    /// Creates an empty list.
    pub fn empty(owner: UserId, kind: ListKind) -> Self {
        Self {
            owner,
            kind,
            products: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.products.contains(&product_id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Appends a product if absent. Returns false if it was already listed.
    pub fn insert(&mut self, product_id: ProductId) -> bool {
        if self.contains(product_id) {
            return false;
        }
        self.products.push(product_id);
        self.updated_at = Utc::now();
        true
    }

    /// Removes a product. Returns false if it was not listed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.products.len();
        self.products.retain(|p| *p != product_id);
        self.updated_at = Utc::now();
        self.products.len() != before
    }

    /// Adds the product if absent, removes it otherwise. Returns true when the
    /// product is listed afterwards.
    pub fn toggle(&mut self, product_id: ProductId) -> bool {
        if self.remove(product_id) {
            false
        } else {
            self.insert(product_id)
        }
    }

    pub fn clear(&mut self) {
        self.products.clear();
        self.updated_at = Utc::now();
    }
}
