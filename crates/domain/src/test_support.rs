use std::collections::BTreeMap;

use chrono::Utc;
use common::{BrandId, CategoryId, ProductId};

use crate::catalog::{Product, slugify};
use crate::money::Money;
use crate::review::RatingSummary;

/// An in-stock product with fresh ids.
pub(crate) fn product(name: &str, price_cents: i64) -> Product {
    let now = Utc::now();
    Product {
        id: ProductId::new(),
        name: name.to_string(),
        slug: slugify(name).unwrap_or_default(),
        description: String::new(),
        price: Money::from_cents(price_cents),
        old_price: None,
        category_id: CategoryId::new(),
        brand_id: BrandId::new(),
        images: Vec::new(),
        characteristics: BTreeMap::new(),
        in_stock: true,
        quantity: 10,
        is_new: false,
        is_sale: false,
        rating: RatingSummary::default(),
        created_at: now,
        updated_at: now,
    }
}
