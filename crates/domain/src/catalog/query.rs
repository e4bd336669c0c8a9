use common::{BrandId, CategoryId, ProductId};

use crate::money::Money;

use super::Product;

/// Builder for constructing product queries.
///
/// Every filter is optional; an empty query matches the whole catalog.
/// Results are always ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Filter by category.
    pub category_id: Option<CategoryId>,

    /// Filter by brand.
    pub brand_id: Option<BrandId>,

    /// Minimum price (inclusive).
    pub min_price: Option<Money>,

    /// Maximum price (inclusive).
    pub max_price: Option<Money>,

    /// Case-insensitive substring of the product name.
    pub name_contains: Option<String>,

    /// Only products flagged as new.
    pub only_new: bool,

    /// Only products flagged as on sale.
    pub only_sale: bool,

    /// Exclude this product from the results.
    pub exclude: Option<ProductId>,

    /// Maximum number of products to return.
    pub limit: Option<usize>,

    /// Number of products to skip.
    pub offset: Option<usize>,
}

impl ProductQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by category.
    pub fn category(mut self, id: CategoryId) -> Self {
        self.category_id = Some(id);
        self
    }

    /// Filters by brand.
    pub fn brand(mut self, id: BrandId) -> Self {
        self.brand_id = Some(id);
        self
    }

    /// Filters to products priced at or above `price`.
    pub fn min_price(mut self, price: Money) -> Self {
        self.min_price = Some(price);
        self
    }

    /// Filters to products priced at or below `price`.
    pub fn max_price(mut self, price: Money) -> Self {
        self.max_price = Some(price);
        self
    }

    /// Filters by a case-insensitive name substring.
    pub fn name_contains(mut self, needle: impl Into<String>) -> Self {
        self.name_contains = Some(needle.into());
        self
    }

    /// Keeps only products flagged as new.
    pub fn only_new(mut self) -> Self {
        self.only_new = true;
        self
    }

    /// Keeps only products flagged as on sale.
    pub fn only_sale(mut self) -> Self {
        self.only_sale = true;
        self
    }

    /// Excludes a single product.
    pub fn exclude(mut self, id: ProductId) -> Self {
        self.exclude = Some(id);
        self
    }

    /// Limits the number of products returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many products before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true when `product` satisfies every filter of this query.
    ///
    /// Paging is not considered.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(id) = self.category_id
            && product.category_id != id
        {
            return false;
        }
        if let Some(id) = self.brand_id
            && product.brand_id != id
        {
            return false;
        }
        if let Some(min) = self.min_price
            && product.price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && product.price > max
        {
            return false;
        }
        if let Some(ref needle) = self.name_contains
            && !product
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase())
        {
            return false;
        }
        if self.only_new && !product.is_new {
            return false;
        }
        if self.only_sale && !product.is_sale {
            return false;
        }
        if self.exclude == Some(product.id) {
            return false;
        }
        true
    }
}

/// One page of query results plus the unpaged match count.
#[derive(Debug, Clone, Default)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: u64,
}

/// Page-number pagination as exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

impl Pagination {
    pub const DEFAULT_LIMIT: usize = 20;
    pub const MAX_LIMIT: usize = 100;

    /// Normalises client-supplied values: page and limit default when
    /// missing or zero, and limit is capped.
    pub fn new(page: Option<usize>, limit: Option<usize>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT);
        Self { page, limit }
    }

    /// Number of products to skip.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}
