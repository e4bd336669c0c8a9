//! Catalog browsing and product administration.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use common::{BrandId, CategoryId, ProductId};
use domain::{Money, NewProduct, Pagination, ProductPatch, Store};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{AdminUser, ApiJson, ApiQuery, invalid_id};
use crate::response::{self, Envelope, PaginationView, ProductView};

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Prices are in cents.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    pub old_price_cents: Option<i64>,
    pub category_id: String,
    pub brand_id: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub characteristics: BTreeMap<String, String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_sale: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub old_price_cents: Option<Option<i64>>,
    pub category_id: Option<String>,
    pub brand_id: Option<String>,
    pub images: Option<Vec<String>>,
    pub characteristics: Option<BTreeMap<String, String>>,
    pub quantity: Option<u32>,
    pub is_new: Option<bool>,
    pub is_sale: Option<bool>,
}

#[derive(Deserialize)]
pub struct StockRequest {
    pub quantity: i64,
}

/// GET /api/products?page&limit: newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Envelope, ApiError> {
    let pagination = Pagination::new(params.page, params.limit);
    let page = state.catalog.list_products(pagination).await?;

    Envelope::ok()
        .with("products", response::products(&page.products))?
        .with("pagination", PaginationView::new(&page, pagination))
}

#[tracing::instrument(skip(state))]
pub async fn new_arrivals<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Envelope, ApiError> {
    let products = state.catalog.new_products().await?;
    Envelope::ok().with("products", response::products(&products))
}

#[tracing::instrument(skip(state))]
pub async fn on_sale<S: Store>(State(state): State<Arc<AppState<S>>>) -> Result<Envelope, ApiError> {
    let products = state.catalog.sale_products().await?;
    Envelope::ok().with("products", response::products(&products))
}

/// GET /api/products/search?q=
#[tracing::instrument(skip(state))]
pub async fn search<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Envelope, ApiError> {
    let products = state
        .catalog
        .search(params.q.as_deref().unwrap_or_default())
        .await?;
    Envelope::ok().with("products", response::products(&products))
}

/// GET /api/products/filter?category&brand&minPrice&maxPrice
#[tracing::instrument(skip(state))]
pub async fn filter<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    ApiQuery(params): ApiQuery<FilterParams>,
) -> Result<Envelope, ApiError> {
    let category = params
        .category
        .as_deref()
        .map(CategoryId::parse)
        .transpose()
        .map_err(invalid_id)?;
    let brand = params
        .brand
        .as_deref()
        .map(BrandId::parse)
        .transpose()
        .map_err(invalid_id)?;

    let products = state
        .catalog
        .filter(
            category,
            brand,
            params.min_price.map(Money::from_cents),
            params.max_price.map(Money::from_cents),
        )
        .await?;
    Envelope::ok().with("products", response::products(&products))
}

#[tracing::instrument(skip(state))]
pub async fn by_category<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(slug): Path<String>,
) -> Result<Envelope, ApiError> {
    let products = state.catalog.products_by_category_slug(&slug).await?;
    Envelope::ok().with("products", response::products(&products))
}

#[tracing::instrument(skip(state))]
pub async fn by_brand<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(slug): Path<String>,
) -> Result<Envelope, ApiError> {
    let products = state.catalog.products_by_brand_slug(&slug).await?;
    Envelope::ok().with("products", response::products(&products))
}

/// GET /api/products/{slug}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(slug): Path<String>,
) -> Result<Envelope, ApiError> {
    let product = state.catalog.product_by_slug(&slug).await?;
    Envelope::ok().with("product", ProductView::from(&product))
}

/// GET /api/products/{slug}/related: same category, at most ten.
#[tracing::instrument(skip(state))]
pub async fn related<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(slug): Path<String>,
) -> Result<Envelope, ApiError> {
    let products = state.catalog.related(&slug).await?;
    Envelope::ok().with("products", response::products(&products))
}

// -- Admin --

/// POST /api/admin/products
#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> Result<Envelope, ApiError> {
    let new = NewProduct {
        name: req.name,
        description: req.description,
        price: Money::from_cents(req.price_cents),
        old_price: req.old_price_cents.map(Money::from_cents),
        category_id: CategoryId::parse(&req.category_id).map_err(invalid_id)?,
        brand_id: BrandId::parse(&req.brand_id).map_err(invalid_id)?,
        images: req.images,
        characteristics: req.characteristics,
        quantity: req.quantity,
        is_new: req.is_new,
        is_sale: req.is_sale,
    };

    let product = state.catalog.create_product(new).await?;
    Envelope::ok().with("product", ProductView::from(&product))
}

/// PATCH /api/admin/products/{id}: partial update.
#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id, product_id = %id))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateProductRequest>,
) -> Result<Envelope, ApiError> {
    let id = ProductId::parse(&id).map_err(invalid_id)?;
    let patch = ProductPatch {
        name: req.name,
        description: req.description,
        price: req.price_cents.map(Money::from_cents),
        old_price: req.old_price_cents.map(|p| p.map(Money::from_cents)),
        category_id: req
            .category_id
            .as_deref()
            .map(CategoryId::parse)
            .transpose()
            .map_err(invalid_id)?,
        brand_id: req
            .brand_id
            .as_deref()
            .map(BrandId::parse)
            .transpose()
            .map_err(invalid_id)?,
        images: req.images,
        characteristics: req.characteristics,
        quantity: req.quantity,
        is_new: req.is_new,
        is_sale: req.is_sale,
    };

    let product = state.catalog.update_product(id, patch).await?;
    Envelope::ok().with("product", ProductView::from(&product))
}

#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id, product_id = %id))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Envelope, ApiError> {
    let id = ProductId::parse(&id).map_err(invalid_id)?;
    state.catalog.delete_product(id).await?;
    Ok(Envelope::ok().message("Product deleted"))
}

/// PATCH /api/admin/products/{id}/stock: availability follows the quantity.
#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id, product_id = %id))]
pub async fn update_stock<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StockRequest>,
) -> Result<Envelope, ApiError> {
    let id = ProductId::parse(&id).map_err(invalid_id)?;
    let product = state.catalog.update_stock(id, req.quantity).await?;
    Envelope::ok().with("product", ProductView::from(&product))
}
