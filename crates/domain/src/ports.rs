//! Repository ports implemented by storage adapters.
//!
//! Every port is an async trait object-safe enough to be implemented by both
//! the in-memory and the Postgres adapter. Services are generic over [`Store`],
//! the union of all ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BrandId, CategoryId, OrderId, ProductId, ReviewId, UserId};
use thiserror::Error;

use crate::cart::Cart;
use crate::catalog::{Brand, Category, Product, ProductPage, ProductQuery};
use crate::identity::{Role, Session, User};
use crate::lists::{ListKind, ProductList};
use crate::order::{Order, OrderStatus};
use crate::review::{Rating, RatingSummary, Review};

/// Errors raised by storage adapters.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A versioned write found the record at a different version.
    #[error("Concurrent modification of {entity} {key}: expected version {expected}, found {actual}")]
    VersionConflict {
        entity: &'static str,
        key: String,
        expected: i64,
        actual: i64,
    },

    /// A conditional write found the record in another state.
    #[error("Concurrent modification of {entity} {key}: expected {expected}, found {actual}")]
    StateConflict {
        entity: &'static str,
        key: String,
        expected: String,
        actual: String,
    },

    /// A uniqueness constraint rejected the write.
    #[error("{entity} with this {field} already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
    },

    /// The backend itself failed (connection, query, driver).
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stored document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepositoryError {
    /// Wraps any backend failure.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepositoryError::Backend(Box::new(err))
    }
}

/// Result type for repository operations.
pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Products, categories and brands.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Inserts a product. Fails with `Duplicate` on a taken slug.
    async fn insert_product(&self, product: &Product) -> RepoResult<()>;

    /// Replaces a stored product. Returns None if it does not exist.
    async fn update_product(&self, product: &Product) -> RepoResult<Option<Product>>;

    /// Returns true if a product was deleted.
    async fn delete_product(&self, id: ProductId) -> RepoResult<bool>;

    async fn find_product(&self, id: ProductId) -> RepoResult<Option<Product>>;

    async fn find_product_by_slug(&self, slug: &str) -> RepoResult<Option<Product>>;

    /// Returns the page selected by the query, newest first, and the
    /// number of products matching its filters.
    async fn query_products(&self, query: ProductQuery) -> RepoResult<ProductPage>;

    /// Overwrites the derived rating fields of a product.
    async fn set_product_rating(&self, id: ProductId, rating: RatingSummary) -> RepoResult<()>;

    /// Sets quantity and availability of a product.
    async fn set_product_stock(&self, id: ProductId, quantity: u32) -> RepoResult<Option<Product>>;

    async fn insert_category(&self, category: &Category) -> RepoResult<()>;

    async fn update_category(&self, category: &Category) -> RepoResult<Option<Category>>;

    async fn delete_category(&self, id: CategoryId) -> RepoResult<bool>;

    async fn find_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;

    async fn find_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>>;

    /// All categories, newest first.
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;

    async fn insert_brand(&self, brand: &Brand) -> RepoResult<()>;

    async fn update_brand(&self, brand: &Brand) -> RepoResult<Option<Brand>>;

    async fn delete_brand(&self, id: BrandId) -> RepoResult<bool>;

    async fn find_brand(&self, id: BrandId) -> RepoResult<Option<Brand>>;

    async fn find_brand_by_slug(&self, slug: &str) -> RepoResult<Option<Brand>>;

    /// All brands, newest first.
    async fn list_brands(&self) -> RepoResult<Vec<Brand>>;
}

/// One cart per owner, written with optimistic concurrency.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find_cart(&self, owner: UserId) -> RepoResult<Option<Cart>>;

    /// Stores a cart.
    ///
    /// `cart.version()` is the version the cart was read at (0 for a cart
    /// that was never stored). If the stored version differs, fails with
    /// `VersionConflict`. Returns the cart at its new version.
    async fn save_cart(&self, cart: &Cart) -> RepoResult<Cart>;
}

/// Order persistence.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts `order` and stores `cleared` in one atomic step.
    ///
    /// `cleared` carries the version the order's cart was read at and is
    /// subject to the same version check as [`CartRepository::save_cart`].
    /// On any failure nothing is written. Returns the cart at its new version.
    async fn place_order(&self, order: &Order, cleared: &Cart) -> RepoResult<Cart>;

    async fn find_order(&self, id: OrderId) -> RepoResult<Option<Order>>;

    /// Orders of one owner, newest first.
    async fn list_orders_for_owner(&self, owner: UserId) -> RepoResult<Vec<Order>>;

    /// All orders, newest first.
    async fn list_orders(&self) -> RepoResult<Vec<Order>>;

    /// Moves an order from `from` to `to`.
    ///
    /// Returns None if the order does not exist and fails with
    /// `StateConflict` if its stored status is no longer `from`.
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<Option<Order>>;
}

/// Review persistence. At most one review per (author, product).
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn find_review_by_author(
        &self,
        author: UserId,
        product: ProductId,
    ) -> RepoResult<Option<Review>>;

    /// Fails with `Duplicate` if the author already reviewed the product.
    async fn insert_review(&self, review: &Review) -> RepoResult<()>;

    /// Replaces rating, text and `updated_at`. Returns false if missing.
    async fn update_review(&self, review: &Review) -> RepoResult<bool>;

    /// Deletes a review, optionally only if written by `author`.
    async fn delete_review(
        &self,
        id: ReviewId,
        author: Option<UserId>,
    ) -> RepoResult<Option<Review>>;

    /// Reviews of a product, newest first.
    async fn list_reviews_for_product(&self, product: ProductId) -> RepoResult<Vec<Review>>;

    /// Every rating given to a product.
    async fn ratings_for_product(&self, product: ProductId) -> RepoResult<Vec<Rating>>;
}

/// User accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Duplicate` on a taken email.
    async fn insert_user(&self, user: &User) -> RepoResult<()>;

    async fn find_user(&self, id: UserId) -> RepoResult<Option<User>>;

    /// Looks up by lowercased email.
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    async fn set_user_role(&self, id: UserId, role: Role) -> RepoResult<bool>;
}

/// Bearer token sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_session(&self, session: &Session) -> RepoResult<()>;

    async fn find_session(&self, token: &str) -> RepoResult<Option<Session>>;

    /// Removes and returns a session, so a token can be consumed only once.
    async fn delete_session(&self, token: &str) -> RepoResult<Option<Session>>;
}

/// Favorites and comparison lists.
#[async_trait]
pub trait ProductListRepository: Send + Sync {
    async fn find_list(&self, owner: UserId, kind: ListKind) -> RepoResult<Option<ProductList>>;

    /// Inserts or replaces the list of `list.owner` and `list.kind`.
    async fn save_list(&self, list: &ProductList) -> RepoResult<()>;
}

/// Every port at once; what services are generic over.
pub trait Store:
    CatalogRepository
    + CartRepository
    + OrderRepository
    + ReviewRepository
    + UserRepository
    + SessionRepository
    + ProductListRepository
    + Clone
    + 'static
{
}

impl<T> Store for T where
    T: CatalogRepository
        + CartRepository
        + OrderRepository
        + ReviewRepository
        + UserRepository
        + SessionRepository
        + ProductListRepository
        + Clone
        + 'static
{
}
