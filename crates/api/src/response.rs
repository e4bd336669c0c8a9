//! Response envelope and wire representations of domain entities.
//!
//! Every response is `{ "success": bool, <entity>: ..., "message"?: string }`.
//! Field names are camelCase; money is integer cents.

use std::collections::{BTreeMap, HashMap};

use axum::Json;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use common::ProductId;
use domain::{
    Brand, Cart, Category, Money, Order, Product, ProductPage, Profile, RatingSummary, Review,
    User,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Successful response body.
#[derive(Debug)]
pub struct Envelope {
    body: Map<String, Value>,
}

impl Envelope {
    pub fn ok() -> Self {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(true));
        Self { body }
    }

    /// Adds an entity under `key`.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Result<Self, ApiError> {
        self.body.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.body
            .insert("message".to_string(), Value::String(message.into()));
        self
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        Json(Value::Object(self.body)).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_price_cents: Option<i64>,
    pub category_id: String,
    pub brand_id: String,
    pub images: Vec<String>,
    pub characteristics: BTreeMap<String, String>,
    pub in_stock: bool,
    pub quantity: u32,
    pub is_new: bool,
    pub is_sale: bool,
    pub rating_avg: f64,
    pub rating_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductView {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.clone(),
            slug: p.slug.clone(),
            description: p.description.clone(),
            price_cents: p.price.cents(),
            old_price_cents: p.old_price.map(|m| m.cents()),
            category_id: p.category_id.to_string(),
            brand_id: p.brand_id.to_string(),
            images: p.images.clone(),
            characteristics: p.characteristics.clone(),
            in_stock: p.in_stock,
            quantity: p.quantity,
            is_new: p.is_new,
            is_sale: p.is_sale,
            rating_avg: p.rating.average(),
            rating_count: p.rating.count(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

pub fn products(items: &[Product]) -> Vec<ProductView> {
    items.iter().map(ProductView::from).collect()
}

/// Paging metadata of a product listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationView {
    pub page: usize,
    pub limit: usize,
    pub total: u64,
    pub pages: u64,
}

impl PaginationView {
    pub fn new(page: &ProductPage, pagination: domain::Pagination) -> Self {
        let limit = pagination.limit as u64;
        Self {
            page: pagination.page,
            limit: pagination.limit,
            total: page.total,
            pages: page.total.div_ceil(limit.max(1)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Category> for CategoryView {
    fn from(c: &Category) -> Self {
        Self {
            id: c.id.to_string(),
            name: c.name.clone(),
            slug: c.slug.clone(),
            parent_id: c.parent_id.map(|id| id.to_string()),
            image: c.image.clone(),
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Brand> for BrandView {
    fn from(b: &Brand) -> Self {
        Self {
            id: b.id.to_string(),
            name: b.name.clone(),
            slug: b.slug.clone(),
            image: b.image.clone(),
            created_at: b.created_at,
        }
    }
}

/// The product fields a cart or order line needs for display.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummaryView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    /// Current catalog price, which may differ from the line's snapshot.
    pub price_cents: i64,
    pub in_stock: bool,
}

impl From<&Product> for ProductSummaryView {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.clone(),
            slug: p.slug.clone(),
            image: p.images.first().cloned(),
            price_cents: p.price.cents(),
            in_stock: p.in_stock,
        }
    }
}

/// A cart or order line. `product` is null once the product is deleted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineView {
    pub product_id: String,
    pub product: Option<ProductSummaryView>,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl LineView {
    fn new(
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
        line_total: Money,
        products: &HashMap<ProductId, Product>,
    ) -> Self {
        Self {
            product_id: product_id.to_string(),
            product: products.get(&product_id).map(ProductSummaryView::from),
            quantity,
            unit_price_cents: unit_price.cents(),
            line_total_cents: line_total.cents(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub user_id: String,
    pub items: Vec<LineView>,
    pub total_cents: i64,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl CartView {
    /// Builds the view, filling each line's product from `products`.
    pub fn new(cart: &Cart, products: &HashMap<ProductId, Product>) -> Self {
        Self {
            user_id: cart.owner().to_string(),
            items: cart
                .lines()
                .iter()
                .map(|l| {
                    LineView::new(l.product_id, l.quantity, l.unit_price, l.line_total(), products)
                })
                .collect(),
            total_cents: cart.total().cents(),
            version: cart.version(),
            updated_at: cart.updated_at(),
        }
    }
}

/// Who placed an order, shown on the admin listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryView {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummaryView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummaryView>,
    pub items: Vec<LineView>,
    pub total_cents: i64,
    pub address: String,
    pub phone: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    /// Builds the view, filling each line's product from `products`.
    pub fn new(order: &Order, products: &HashMap<ProductId, Product>) -> Self {
        Self {
            id: order.id().to_string(),
            user_id: order.owner().to_string(),
            user: None,
            items: order
                .lines()
                .iter()
                .map(|l| {
                    LineView::new(l.product_id, l.quantity, l.unit_price, l.line_total(), products)
                })
                .collect(),
            total_cents: order.total().cents(),
            address: order.address().to_string(),
            phone: order.phone().to_string(),
            status: order.status().to_string(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }

    /// Attaches the ordering user when known.
    pub fn with_user(mut self, user: Option<&User>) -> Self {
        self.user = user.map(UserSummaryView::from);
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: String,
    pub product_id: String,
    pub user_id: String,
    /// The author's display name, filled on listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub rating: u8,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Review> for ReviewView {
    fn from(r: &Review) -> Self {
        Self {
            id: r.id.to_string(),
            product_id: r.product_id.to_string(),
            user_id: r.author_id.to_string(),
            user_name: None,
            rating: r.rating.value(),
            text: r.text.clone(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl ReviewView {
    /// Attaches the author's name when known.
    pub fn with_author(mut self, author: Option<&User>) -> Self {
        self.user_name = author.map(|u| u.name.clone());
        self
    }
}

/// A product's aggregate rating after a review write.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingView {
    pub rating_avg: f64,
    pub rating_count: u32,
}

impl From<RatingSummary> for RatingView {
    fn from(summary: RatingSummary) -> Self {
        Self {
            rating_avg: summary.average(),
            rating_count: summary.count(),
        }
    }
}

/// A user without credentials.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub provider: String,
    pub role: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            name: u.name.clone(),
            email: u.email.clone(),
            provider: u.provider.clone(),
            role: u.role.to_string(),
            is_verified: u.is_verified,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountsView {
    pub favorites: usize,
    pub compare: usize,
    pub cart: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user: UserView,
    pub counts: CountsView,
    pub cart_total_cents: i64,
}

impl From<&Profile> for ProfileView {
    fn from(p: &Profile) -> Self {
        Self {
            user: UserView::from(&p.user),
            counts: CountsView {
                favorites: p.counts.favorites,
                compare: p.counts.compare,
                cart: p.counts.cart,
            },
            cart_total_cents: p.cart_total.cents(),
        }
    }
}
