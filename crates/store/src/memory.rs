use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BrandId, CategoryId, OrderId, ProductId, ReviewId, UserId};
use domain::ports::{
    CartRepository, CatalogRepository, OrderRepository, ProductListRepository, RepoResult,
    RepositoryError, ReviewRepository, SessionRepository, UserRepository,
};
use domain::{
    Brand, Cart, Category, ListKind, Order, OrderStatus, Product, ProductList, ProductPage,
    ProductQuery, Rating, RatingSummary, Review, Role, Session, User,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct Catalog {
    // Insertion order; reads sort newest first.
    products: Vec<Product>,
    categories: Vec<Category>,
    brands: Vec<Brand>,
}

/// Carts and orders share one lock so checkout is atomic.
#[derive(Default)]
struct Sales {
    carts: HashMap<UserId, Cart>,
    orders: Vec<Order>,
}

/// In-memory store implementation for testing and single-process runs.
///
/// This implementation keeps everything in memory and provides the same
/// behaviour as the PostgreSQL implementation: unique slugs, emails and
/// (author, product) review pairs, versioned cart writes, and atomic order
/// placement.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    catalog: Arc<RwLock<Catalog>>,
    sales: Arc<RwLock<Sales>>,
    reviews: Arc<RwLock<Vec<Review>>>,
    users: Arc<RwLock<HashMap<UserId, User>>>,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    lists: Arc<RwLock<HashMap<(UserId, ListKind), ProductList>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.sales.read().await.orders.len()
    }

    /// Returns the number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Clones `items` newest first; equal timestamps keep the most recently
/// inserted first.
fn newest_first<'a, T, I, F>(items: I, created_at: F) -> Vec<T>
where
    T: Clone + 'a,
    I: DoubleEndedIterator<Item = &'a T>,
    F: Fn(&T) -> DateTime<Utc>,
{
    let mut out: Vec<T> = items.rev().cloned().collect();
    out.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    out
}

fn write_cart(carts: &mut HashMap<UserId, Cart>, cart: &Cart) -> RepoResult<Cart> {
    let actual = carts.get(&cart.owner()).map_or(0, Cart::version);
    if actual != cart.version() {
        return Err(RepositoryError::VersionConflict {
            entity: "cart",
            key: cart.owner().to_string(),
            expected: cart.version(),
            actual,
        });
    }

    let stored = cart.clone().with_version(actual + 1);
    carts.insert(cart.owner(), stored.clone());
    Ok(stored)
}

fn duplicate_slug(entity: &'static str) -> RepositoryError {
    RepositoryError::Duplicate {
        entity,
        field: "slug",
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn insert_product(&self, product: &Product) -> RepoResult<()> {
        let mut catalog = self.catalog.write().await;
        if catalog.products.iter().any(|p| p.slug == product.slug) {
            return Err(duplicate_slug("Product"));
        }
        catalog.products.push(product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> RepoResult<Option<Product>> {
        let mut catalog = self.catalog.write().await;
        if catalog
            .products
            .iter()
            .any(|p| p.slug == product.slug && p.id != product.id)
        {
            return Err(duplicate_slug("Product"));
        }
        let Some(stored) = catalog.products.iter_mut().find(|p| p.id == product.id) else {
            return Ok(None);
        };
        // Rating fields are derived and owned by the review workflow.
        let rating = stored.rating;
        *stored = product.clone();
        stored.rating = rating;
        Ok(Some(stored.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> RepoResult<bool> {
        let mut catalog = self.catalog.write().await;
        let before = catalog.products.len();
        catalog.products.retain(|p| p.id != id);
        let deleted = catalog.products.len() != before;
        if deleted {
            self.reviews.write().await.retain(|r| r.product_id != id);
        }
        Ok(deleted)
    }

    async fn find_product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.products.iter().find(|p| p.id == id).cloned())
    }

    async fn find_product_by_slug(&self, slug: &str) -> RepoResult<Option<Product>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.products.iter().find(|p| p.slug == slug).cloned())
    }

    async fn query_products(&self, query: ProductQuery) -> RepoResult<ProductPage> {
        let catalog = self.catalog.read().await;
        let matching = newest_first(
            catalog.products.iter().filter(|p| query.matches(p)).collect::<Vec<_>>().into_iter(),
            |p: &Product| p.created_at,
        );

        let total = matching.len() as u64;
        let offset = query.offset.unwrap_or(0);
        let products: Vec<_> = matching.into_iter().skip(offset).collect();
        let products = if let Some(limit) = query.limit {
            products.into_iter().take(limit).collect()
        } else {
            products
        };

        Ok(ProductPage { products, total })
    }

    async fn set_product_rating(&self, id: ProductId, rating: RatingSummary) -> RepoResult<()> {
        let mut catalog = self.catalog.write().await;
        if let Some(product) = catalog.products.iter_mut().find(|p| p.id == id) {
            product.rating = rating;
        }
        Ok(())
    }

    async fn set_product_stock(&self, id: ProductId, quantity: u32) -> RepoResult<Option<Product>> {
        let mut catalog = self.catalog.write().await;
        Ok(catalog
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .map(|product| {
                product.set_stock(quantity);
                product.updated_at = Utc::now();
                product.clone()
            }))
    }

    async fn insert_category(&self, category: &Category) -> RepoResult<()> {
        let mut catalog = self.catalog.write().await;
        if catalog.categories.iter().any(|c| c.slug == category.slug) {
            return Err(duplicate_slug("Category"));
        }
        catalog.categories.push(category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> RepoResult<Option<Category>> {
        let mut catalog = self.catalog.write().await;
        if catalog
            .categories
            .iter()
            .any(|c| c.slug == category.slug && c.id != category.id)
        {
            return Err(duplicate_slug("Category"));
        }
        Ok(catalog
            .categories
            .iter_mut()
            .find(|c| c.id == category.id)
            .map(|stored| {
                *stored = category.clone();
                stored.clone()
            }))
    }

    async fn delete_category(&self, id: CategoryId) -> RepoResult<bool> {
        let mut catalog = self.catalog.write().await;
        let before = catalog.categories.len();
        catalog.categories.retain(|c| c.id != id);
        let deleted = catalog.categories.len() != before;
        if deleted {
            for child in catalog
                .categories
                .iter_mut()
                .filter(|c| c.parent_id == Some(id))
            {
                child.parent_id = None;
            }
        }
        Ok(deleted)
    }

    async fn find_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let catalog = self.catalog.read().await;
        Ok(newest_first(catalog.categories.iter(), |c: &Category| {
            c.created_at
        }))
    }

    async fn insert_brand(&self, brand: &Brand) -> RepoResult<()> {
        let mut catalog = self.catalog.write().await;
        if catalog.brands.iter().any(|b| b.slug == brand.slug) {
            return Err(duplicate_slug("Brand"));
        }
        catalog.brands.push(brand.clone());
        Ok(())
    }

    async fn update_brand(&self, brand: &Brand) -> RepoResult<Option<Brand>> {
        let mut catalog = self.catalog.write().await;
        if catalog
            .brands
            .iter()
            .any(|b| b.slug == brand.slug && b.id != brand.id)
        {
            return Err(duplicate_slug("Brand"));
        }
        Ok(catalog
            .brands
            .iter_mut()
            .find(|b| b.id == brand.id)
            .map(|stored| {
                *stored = brand.clone();
                stored.clone()
            }))
    }

    async fn delete_brand(&self, id: BrandId) -> RepoResult<bool> {
        let mut catalog = self.catalog.write().await;
        let before = catalog.brands.len();
        catalog.brands.retain(|b| b.id != id);
        Ok(catalog.brands.len() != before)
    }

    async fn find_brand(&self, id: BrandId) -> RepoResult<Option<Brand>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.brands.iter().find(|b| b.id == id).cloned())
    }

    async fn find_brand_by_slug(&self, slug: &str) -> RepoResult<Option<Brand>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.brands.iter().find(|b| b.slug == slug).cloned())
    }

    async fn list_brands(&self) -> RepoResult<Vec<Brand>> {
        let catalog = self.catalog.read().await;
        Ok(newest_first(catalog.brands.iter(), |b: &Brand| b.created_at))
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn find_cart(&self, owner: UserId) -> RepoResult<Option<Cart>> {
        Ok(self.sales.read().await.carts.get(&owner).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> RepoResult<Cart> {
        let mut sales = self.sales.write().await;
        write_cart(&mut sales.carts, cart)
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn place_order(&self, order: &Order, cleared: &Cart) -> RepoResult<Cart> {
        let mut sales = self.sales.write().await;
        // The cart check runs first so a conflict leaves no order behind.
        let cart = write_cart(&mut sales.carts, cleared)?;
        sales.orders.push(order.clone());
        Ok(cart)
    }

    async fn find_order(&self, id: OrderId) -> RepoResult<Option<Order>> {
        let sales = self.sales.read().await;
        Ok(sales.orders.iter().find(|o| o.id() == id).cloned())
    }

    async fn list_orders_for_owner(&self, owner: UserId) -> RepoResult<Vec<Order>> {
        let sales = self.sales.read().await;
        let owned: Vec<&Order> = sales.orders.iter().filter(|o| o.owner() == owner).collect();
        Ok(newest_first(owned.into_iter(), Order::created_at))
    }

    async fn list_orders(&self) -> RepoResult<Vec<Order>> {
        let sales = self.sales.read().await;
        Ok(newest_first(sales.orders.iter(), Order::created_at))
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<Option<Order>> {
        let mut sales = self.sales.write().await;
        let Some(stored) = sales.orders.iter_mut().find(|o| o.id() == id) else {
            return Ok(None);
        };
        if stored.status() != from {
            return Err(RepositoryError::StateConflict {
                entity: "order",
                key: id.to_string(),
                expected: from.to_string(),
                actual: stored.status().to_string(),
            });
        }

        *stored = Order::restore(
            stored.id(),
            stored.owner(),
            stored.lines().to_vec(),
            stored.total(),
            stored.address().to_string(),
            stored.phone().to_string(),
            to,
            stored.created_at(),
            updated_at,
        );
        Ok(Some(stored.clone()))
    }
}

#[async_trait]
impl ReviewRepository for InMemoryStore {
    async fn find_review_by_author(
        &self,
        author: UserId,
        product: ProductId,
    ) -> RepoResult<Option<Review>> {
        let reviews = self.reviews.read().await;
        Ok(reviews
            .iter()
            .find(|r| r.author_id == author && r.product_id == product)
            .cloned())
    }

    async fn insert_review(&self, review: &Review) -> RepoResult<()> {
        let mut reviews = self.reviews.write().await;
        if reviews
            .iter()
            .any(|r| r.author_id == review.author_id && r.product_id == review.product_id)
        {
            return Err(RepositoryError::Duplicate {
                entity: "Review",
                field: "author and product",
            });
        }
        reviews.push(review.clone());
        Ok(())
    }

    async fn update_review(&self, review: &Review) -> RepoResult<bool> {
        let mut reviews = self.reviews.write().await;
        match reviews.iter_mut().find(|r| r.id == review.id) {
            Some(stored) => {
                stored.rating = review.rating;
                stored.text = review.text.clone();
                stored.updated_at = review.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_review(
        &self,
        id: ReviewId,
        author: Option<UserId>,
    ) -> RepoResult<Option<Review>> {
        let mut reviews = self.reviews.write().await;
        let position = reviews
            .iter()
            .position(|r| r.id == id && author.is_none_or(|a| r.author_id == a));
        Ok(position.map(|i| reviews.remove(i)))
    }

    async fn list_reviews_for_product(&self, product: ProductId) -> RepoResult<Vec<Review>> {
        let reviews = self.reviews.read().await;
        let matching: Vec<&Review> = reviews.iter().filter(|r| r.product_id == product).collect();
        Ok(newest_first(matching.into_iter(), |r: &Review| r.created_at))
    }

    async fn ratings_for_product(&self, product: ProductId) -> RepoResult<Vec<Rating>> {
        let reviews = self.reviews.read().await;
        Ok(reviews
            .iter()
            .filter(|r| r.product_id == product)
            .map(|r| r.rating)
            .collect())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert_user(&self, user: &User) -> RepoResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Duplicate {
                entity: "User",
                field: "email",
            });
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> RepoResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn set_user_role(&self, id: UserId, role: Role) -> RepoResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn insert_session(&self, session: &Session) -> RepoResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token: &str) -> RepoResult<Option<Session>> {
        Ok(self.sessions.read().await.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> RepoResult<Option<Session>> {
        Ok(self.sessions.write().await.remove(token))
    }
}

#[async_trait]
impl ProductListRepository for InMemoryStore {
    async fn find_list(&self, owner: UserId, kind: ListKind) -> RepoResult<Option<ProductList>> {
        Ok(self.lists.read().await.get(&(owner, kind)).cloned())
    }

    async fn save_list(&self, list: &ProductList) -> RepoResult<()> {
        let mut lists = self.lists.write().await;
        lists.insert((list.owner, list.kind), list.clone());
        Ok(())
    }
}
