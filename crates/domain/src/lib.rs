//! Storefront domain layer.
//!
//! Entities and their business rules, the repository ports storage adapters
//! implement, and the services the HTTP layer calls:
//! - [`cart`]: per-user carts with price snapshots and full-fold totals
//! - [`order`]: checkout from a cart and the order status lifecycle
//! - [`review`]: one review per author and product, rating aggregation
//! - [`catalog`]: products, categories and brands
//! - [`lists`]: favorites and the comparison list
//! - [`identity`]: accounts, password hashing and bearer sessions
//! - [`profile`]: user profile counters

pub mod cart;
pub mod catalog;
pub mod error;
pub mod identity;
pub mod lists;
pub mod money;
pub mod order;
pub mod ports;
pub mod profile;
pub mod review;

#[cfg(test)]
mod test_support;

pub use cart::{Cart, CartLine, CartService};
pub use catalog::{
    Brand, BrandPatch, CatalogService, Category, CategoryPatch, NewProduct, Pagination, Product,
    ProductPage, ProductPatch, ProductQuery, slugify,
};
pub use error::DomainError;
pub use identity::{AuthService, Identity, Role, Session, TokenKind, TokenPair, TokenSettings, User};
pub use lists::{COMPARE_LIMIT, CompareService, FavoritesService, ListKind, ProductList};
pub use money::Money;
pub use order::{Order, OrderLine, OrderService, OrderStatus, ShippingDetails};
pub use ports::{
    CartRepository, CatalogRepository, OrderRepository, ProductListRepository, RepoResult,
    RepositoryError, ReviewRepository, SessionRepository, Store, UserRepository,
};
pub use profile::{Profile, ProfileCounts, ProfileService};
pub use review::{Rating, RatingSummary, Review, ReviewService};
