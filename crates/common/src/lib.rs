//! Identifier types shared by every storefront crate.

mod types;

pub use types::{BrandId, CategoryId, OrderId, ProductId, ReviewId, UserId};
