use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BrandId, CategoryId, OrderId, ProductId, ReviewId, UserId};
use domain::ports::{
    CartRepository, CatalogRepository, OrderRepository, ProductListRepository, RepoResult,
    RepositoryError, ReviewRepository, SessionRepository, UserRepository,
};
use domain::{
    Brand, Cart, CartLine, Category, ListKind, Money, Order, OrderLine, OrderStatus, Product,
    ProductList, ProductPage, ProductQuery, Rating, RatingSummary, Review, Role, Session,
    TokenKind, User,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "id, name, slug, description, price_cents, old_price_cents, \
    category_id, brand_id, images, characteristics, in_stock, quantity, is_new, is_sale, \
    rating_avg_tenths, rating_count, created_at, updated_at";

const ORDER_COLUMNS: &str =
    "id, owner_id, lines, total_cents, address, phone, status, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, product_id, author_id, rating, text, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, name, email, password_hash, provider, role, is_verified, created_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` connections.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

/// Maps a driver error to a repository error, translating unique
/// constraint violations into `Duplicate`.
fn db_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        let duplicate = match db_err.constraint() {
            Some("products_slug_key") => Some(("Product", "slug")),
            Some("categories_slug_key") => Some(("Category", "slug")),
            Some("brands_slug_key") => Some(("Brand", "slug")),
            Some("users_email_key") => Some(("User", "email")),
            Some("reviews_author_product_key") => Some(("Review", "author and product")),
            _ => None,
        };
        if let Some((entity, field)) = duplicate {
            return RepositoryError::Duplicate { entity, field };
        }
        tracing::debug!(code = ?db_err.code(), message = db_err.message(), "database operation failed");
    }
    RepositoryError::backend(err)
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn to_u32(value: i64, column: &str) -> Result<u32, sqlx::Error> {
    u32::try_from(value).map_err(|_| decode_error(format!("{column} out of range: {value}")))
}

fn row_to_product(row: &PgRow) -> Result<Product, sqlx::Error> {
    let characteristics: Json<BTreeMap<String, String>> = row.try_get("characteristics")?;
    let avg_tenths: i32 = row.try_get("rating_avg_tenths")?;
    let rating_count: i64 = row.try_get("rating_count")?;

    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        old_price: row
            .try_get::<Option<i64>, _>("old_price_cents")?
            .map(Money::from_cents),
        category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
        brand_id: BrandId::from_uuid(row.try_get::<Uuid, _>("brand_id")?),
        images: row.try_get("images")?,
        characteristics: characteristics.0,
        in_stock: row.try_get("in_stock")?,
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        is_new: row.try_get("is_new")?,
        is_sale: row.try_get("is_sale")?,
        rating: RatingSummary::from_parts(
            to_u32(i64::from(avg_tenths), "rating_avg_tenths")?,
            to_u32(rating_count, "rating_count")?,
        ),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_category(row: &PgRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        parent_id: row
            .try_get::<Option<Uuid>, _>("parent_id")?
            .map(CategoryId::from_uuid),
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_brand(row: &PgRow) -> Result<Brand, sqlx::Error> {
    Ok(Brand {
        id: BrandId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_cart(row: &PgRow) -> Result<Cart, sqlx::Error> {
    let lines: Json<Vec<CartLine>> = row.try_get("lines")?;
    Ok(Cart::restore(
        UserId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
        lines.0,
        row.try_get("version")?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

fn row_to_order(row: &PgRow) -> Result<Order, sqlx::Error> {
    let lines: Json<Vec<OrderLine>> = row.try_get("lines")?;
    let status: String = row.try_get("status")?;
    let status: OrderStatus = status
        .parse()
        .map_err(|e: domain::DomainError| decode_error(e.to_string()))?;

    Ok(Order::restore(
        OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        UserId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
        lines.0,
        Money::from_cents(row.try_get("total_cents")?),
        row.try_get("address")?,
        row.try_get("phone")?,
        status,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

fn row_to_review(row: &PgRow) -> Result<Review, sqlx::Error> {
    let rating: i16 = row.try_get("rating")?;
    Ok(Review {
        id: ReviewId::from_uuid(row.try_get::<Uuid, _>("id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        author_id: UserId::from_uuid(row.try_get::<Uuid, _>("author_id")?),
        rating: Rating::new(i64::from(rating)).map_err(|e| decode_error(e.to_string()))?,
        text: row.try_get("text")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn parse_role(value: &str) -> Result<Role, sqlx::Error> {
    Role::parse(value).ok_or_else(|| decode_error(format!("unknown role: {value}")))
}

fn row_to_user(row: &PgRow) -> Result<User, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        provider: row.try_get("provider")?,
        role: parse_role(&role)?,
        is_verified: row.try_get("is_verified")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_session(row: &PgRow) -> Result<Session, sqlx::Error> {
    let role: String = row.try_get("role")?;
    let kind: String = row.try_get("kind")?;
    Ok(Session {
        token: row.try_get("token")?,
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        role: parse_role(&role)?,
        kind: TokenKind::parse(&kind)
            .ok_or_else(|| decode_error(format!("unknown token kind: {kind}")))?,
        expires_at: row.try_get("expires_at")?,
    })
}

fn map_rows<T>(
    rows: Vec<PgRow>,
    f: impl Fn(&PgRow) -> Result<T, sqlx::Error>,
) -> RepoResult<Vec<T>> {
    rows.iter().map(f).collect::<Result<_, _>>().map_err(db_error)
}

fn map_optional<T>(
    row: Option<PgRow>,
    f: impl Fn(&PgRow) -> Result<T, sqlx::Error>,
) -> RepoResult<Option<T>> {
    row.as_ref().map(f).transpose().map_err(db_error)
}

/// Appends the WHERE clause of a product query.
fn push_product_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    builder.push(" WHERE TRUE");
    if let Some(id) = query.category_id {
        builder.push(" AND category_id = ").push_bind(id.as_uuid());
    }
    if let Some(id) = query.brand_id {
        builder.push(" AND brand_id = ").push_bind(id.as_uuid());
    }
    if let Some(min) = query.min_price {
        builder.push(" AND price_cents >= ").push_bind(min.cents());
    }
    if let Some(max) = query.max_price {
        builder.push(" AND price_cents <= ").push_bind(max.cents());
    }
    if let Some(ref needle) = query.name_contains {
        builder
            .push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(needle)))
            .push(" ESCAPE '\\'");
    }
    if query.only_new {
        builder.push(" AND is_new");
    }
    if query.only_sale {
        builder.push(" AND is_sale");
    }
    if let Some(id) = query.exclude {
        builder.push(" AND id <> ").push_bind(id.as_uuid());
    }
}

/// Escapes LIKE wildcards so the needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Writes a cart guarded by the version it was read at.
///
/// Locks the stored row for the rest of the caller's transaction.
async fn write_cart(conn: &mut PgConnection, cart: &Cart) -> RepoResult<Cart> {
    let owner = cart.owner();
    let current: Option<i64> =
        sqlx::query_scalar("SELECT version FROM carts WHERE owner_id = $1 FOR UPDATE")
            .bind(owner.as_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_error)?;

    let actual = current.unwrap_or(0);
    let conflict = || RepositoryError::VersionConflict {
        entity: "cart",
        key: owner.to_string(),
        expected: cart.version(),
        actual,
    };
    if actual != cart.version() {
        return Err(conflict());
    }

    let lines = Json(cart.lines().to_vec());
    let next = actual + 1;
    if current.is_none() {
        sqlx::query(
            r#"
            INSERT INTO carts (owner_id, lines, total_cents, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(owner.as_uuid())
        .bind(&lines)
        .bind(cart.total().cents())
        .bind(next)
        .bind(cart.created_at())
        .bind(cart.updated_at())
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            // A concurrent first write created the row.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("carts_pkey")
            {
                return conflict();
            }
            db_error(e)
        })?;
    } else {
        sqlx::query(
            r#"
            UPDATE carts SET lines = $2, total_cents = $3, version = $4, updated_at = $5
            WHERE owner_id = $1
            "#,
        )
        .bind(owner.as_uuid())
        .bind(&lines)
        .bind(cart.total().cents())
        .bind(next)
        .bind(cart.updated_at())
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    }

    Ok(cart.clone().with_version(next))
}

#[async_trait]
impl CatalogRepository for PostgresStore {
    async fn insert_product(&self, product: &Product) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, slug, description, price_cents, old_price_cents,
                category_id, brand_id, images, characteristics, in_stock, quantity, is_new,
                is_sale, rating_avg_tenths, rating_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.old_price.map(|m| m.cents()))
        .bind(product.category_id.as_uuid())
        .bind(product.brand_id.as_uuid())
        .bind(&product.images)
        .bind(Json(&product.characteristics))
        .bind(product.in_stock)
        .bind(i64::from(product.quantity))
        .bind(product.is_new)
        .bind(product.is_sale)
        .bind(product.rating.average_tenths() as i32)
        .bind(i64::from(product.rating.count()))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn update_product(&self, product: &Product) -> RepoResult<Option<Product>> {
        let sql = format!(
            r#"
            UPDATE products SET name = $2, slug = $3, description = $4, price_cents = $5,
                old_price_cents = $6, category_id = $7, brand_id = $8, images = $9,
                characteristics = $10, in_stock = $11, quantity = $12, is_new = $13,
                is_sale = $14, updated_at = $15
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(product.id.as_uuid())
            .bind(&product.name)
            .bind(&product.slug)
            .bind(&product.description)
            .bind(product.price.cents())
            .bind(product.old_price.map(|m| m.cents()))
            .bind(product.category_id.as_uuid())
            .bind(product.brand_id.as_uuid())
            .bind(&product.images)
            .bind(Json(&product.characteristics))
            .bind(product.in_stock)
            .bind(i64::from(product.quantity))
            .bind(product.is_new)
            .bind(product.is_sale)
            .bind(product.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        map_optional(row, row_to_product)
    }

    async fn delete_product(&self, id: ProductId) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        map_optional(row, row_to_product)
    }

    async fn find_product_by_slug(&self, slug: &str) -> RepoResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1");
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        map_optional(row, row_to_product)
    }

    async fn query_products(&self, query: ProductQuery) -> RepoResult<ProductPage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_product_filters(&mut count, &query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products"
        ));
        push_product_filters(&mut select, &query);
        select.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = query.limit {
            select.push(" LIMIT ").push_bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            select.push(" OFFSET ").push_bind(offset as i64);
        }

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(ProductPage {
            products: map_rows(rows, row_to_product)?,
            total: total.max(0) as u64,
        })
    }

    async fn set_product_rating(&self, id: ProductId, rating: RatingSummary) -> RepoResult<()> {
        sqlx::query(
            "UPDATE products SET rating_avg_tenths = $2, rating_count = $3 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(rating.average_tenths() as i32)
        .bind(i64::from(rating.count()))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn set_product_stock(&self, id: ProductId, quantity: u32) -> RepoResult<Option<Product>> {
        let sql = format!(
            r#"
            UPDATE products SET quantity = $2, in_stock = $2 > 0, updated_at = $3
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(i64::from(quantity))
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        map_optional(row, row_to_product)
    }

    async fn insert_category(&self, category: &Category) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, slug, parent_id, image, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(category.parent_id.map(|p| p.as_uuid()))
        .bind(&category.image)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> RepoResult<Option<Category>> {
        let row = sqlx::query(
            r#"
            UPDATE categories SET name = $2, slug = $3, parent_id = $4, image = $5
            WHERE id = $1
            RETURNING id, name, slug, parent_id, image, created_at
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(category.parent_id.map(|p| p.as_uuid()))
        .bind(&category.image)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        map_optional(row, row_to_category)
    }

    async fn delete_category(&self, id: CategoryId) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, name, slug, parent_id, image, created_at FROM categories WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        map_optional(row, row_to_category)
    }

    async fn find_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, name, slug, parent_id, image, created_at FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        map_optional(row, row_to_category)
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, slug, parent_id, image, created_at
            FROM categories
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        map_rows(rows, row_to_category)
    }

    async fn insert_brand(&self, brand: &Brand) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO brands (id, name, slug, image, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(brand.id.as_uuid())
        .bind(&brand.name)
        .bind(&brand.slug)
        .bind(&brand.image)
        .bind(brand.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn update_brand(&self, brand: &Brand) -> RepoResult<Option<Brand>> {
        let row = sqlx::query(
            r#"
            UPDATE brands SET name = $2, slug = $3, image = $4
            WHERE id = $1
            RETURNING id, name, slug, image, created_at
            "#,
        )
        .bind(brand.id.as_uuid())
        .bind(&brand.name)
        .bind(&brand.slug)
        .bind(&brand.image)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        map_optional(row, row_to_brand)
    }

    async fn delete_brand(&self, id: BrandId) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM brands WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_brand(&self, id: BrandId) -> RepoResult<Option<Brand>> {
        let row = sqlx::query("SELECT id, name, slug, image, created_at FROM brands WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        map_optional(row, row_to_brand)
    }

    async fn find_brand_by_slug(&self, slug: &str) -> RepoResult<Option<Brand>> {
        let row =
            sqlx::query("SELECT id, name, slug, image, created_at FROM brands WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
        map_optional(row, row_to_brand)
    }

    async fn list_brands(&self) -> RepoResult<Vec<Brand>> {
        let rows = sqlx::query(
            "SELECT id, name, slug, image, created_at FROM brands ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        map_rows(rows, row_to_brand)
    }
}

#[async_trait]
impl CartRepository for PostgresStore {
    async fn find_cart(&self, owner: UserId) -> RepoResult<Option<Cart>> {
        let row = sqlx::query(
            "SELECT owner_id, lines, version, created_at, updated_at FROM carts WHERE owner_id = $1",
        )
        .bind(owner.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        map_optional(row, row_to_cart)
    }

    async fn save_cart(&self, cart: &Cart) -> RepoResult<Cart> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let stored = write_cart(&mut *tx, cart).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(stored)
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn place_order(&self, order: &Order, cleared: &Cart) -> RepoResult<Cart> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let cart = write_cart(&mut *tx, cleared).await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, owner_id, lines, total_cents, address, phone, status,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.owner().as_uuid())
        .bind(Json(order.lines()))
        .bind(order.total().cents())
        .bind(order.address())
        .bind(order.phone())
        .bind(order.status().as_str())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(cart)
    }

    async fn find_order(&self, id: OrderId) -> RepoResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        map_optional(row, row_to_order)
    }

    async fn list_orders_for_owner(&self, owner: UserId) -> RepoResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(owner.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        map_rows(rows, row_to_order)
    }

    async fn list_orders(&self) -> RepoResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        map_rows(rows, row_to_order)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<Option<Order>> {
        let sql = format!(
            "UPDATE orders SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        if let Some(row) = row {
            return row_to_order(&row).map(Some).map_err(db_error);
        }

        // No row matched: either the order is gone or its status moved on.
        let actual: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        match actual {
            None => Ok(None),
            Some(actual) => Err(RepositoryError::StateConflict {
                entity: "order",
                key: id.to_string(),
                expected: from.to_string(),
                actual,
            }),
        }
    }
}

#[async_trait]
impl ReviewRepository for PostgresStore {
    async fn find_review_by_author(
        &self,
        author: UserId,
        product: ProductId,
    ) -> RepoResult<Option<Review>> {
        let sql =
            format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE author_id = $1 AND product_id = $2");
        let row = sqlx::query(&sql)
            .bind(author.as_uuid())
            .bind(product.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        map_optional(row, row_to_review)
    }

    async fn insert_review(&self, review: &Review) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, product_id, author_id, rating, text, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(review.product_id.as_uuid())
        .bind(review.author_id.as_uuid())
        .bind(i16::from(review.rating.value()))
        .bind(&review.text)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn update_review(&self, review: &Review) -> RepoResult<bool> {
        let result =
            sqlx::query("UPDATE reviews SET rating = $2, text = $3, updated_at = $4 WHERE id = $1")
                .bind(review.id.as_uuid())
                .bind(i16::from(review.rating.value()))
                .bind(&review.text)
                .bind(review.updated_at)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_review(
        &self,
        id: ReviewId,
        author: Option<UserId>,
    ) -> RepoResult<Option<Review>> {
        let sql = format!(
            r#"
            DELETE FROM reviews
            WHERE id = $1 AND ($2::uuid IS NULL OR author_id = $2)
            RETURNING {REVIEW_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(author.map(|a| a.as_uuid()))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        map_optional(row, row_to_review)
    }

    async fn list_reviews_for_product(&self, product: ProductId) -> RepoResult<Vec<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(product.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        map_rows(rows, row_to_review)
    }

    async fn ratings_for_product(&self, product: ProductId) -> RepoResult<Vec<Rating>> {
        let values: Vec<i16> = sqlx::query_scalar("SELECT rating FROM reviews WHERE product_id = $1")
            .bind(product.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        values
            .into_iter()
            .map(|v| {
                Rating::new(i64::from(v))
                    .map_err(|e| db_error(decode_error(e.to_string())))
            })
            .collect()
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn insert_user(&self, user: &User) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, provider, role, is_verified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.provider)
        .bind(user.role.as_str())
        .bind(user.is_verified)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        map_optional(row, row_to_user)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        map_optional(row, row_to_user)
    }

    async fn set_user_role(&self, id: UserId, role: Role) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionRepository for PostgresStore {
    async fn insert_session(&self, session: &Session) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, role, kind, expires_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&session.token)
        .bind(session.user_id.as_uuid())
        .bind(session.role.as_str())
        .bind(session.kind.as_str())
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> RepoResult<Option<Session>> {
        let row = sqlx::query(
            "SELECT token, user_id, role, kind, expires_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        map_optional(row, row_to_session)
    }

    async fn delete_session(&self, token: &str) -> RepoResult<Option<Session>> {
        let row = sqlx::query(
            "DELETE FROM sessions WHERE token = $1 RETURNING token, user_id, role, kind, expires_at",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        map_optional(row, row_to_session)
    }
}

#[async_trait]
impl ProductListRepository for PostgresStore {
    async fn find_list(&self, owner: UserId, kind: ListKind) -> RepoResult<Option<ProductList>> {
        let row = sqlx::query(
            "SELECT products, updated_at FROM product_lists WHERE owner_id = $1 AND kind = $2",
        )
        .bind(owner.as_uuid())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        map_optional(row, |row| {
            let products: Vec<Uuid> = row.try_get("products")?;
            Ok(ProductList {
                owner,
                kind,
                products: products.into_iter().map(ProductId::from_uuid).collect(),
                updated_at: row.try_get("updated_at")?,
            })
        })
    }

    async fn save_list(&self, list: &ProductList) -> RepoResult<()> {
        let products: Vec<Uuid> = list.products.iter().map(|p| p.as_uuid()).collect();
        sqlx::query(
            r#"
            INSERT INTO product_lists (owner_id, kind, products, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (owner_id, kind) DO UPDATE SET
                products = EXCLUDED.products,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(list.owner.as_uuid())
        .bind(list.kind.as_str())
        .bind(products)
        .bind(list.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}
