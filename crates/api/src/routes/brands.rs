//! Brand reads and administration.

use std::sync::Arc;

use axum::extract::{Path, State};
use common::BrandId;
use domain::{BrandPatch, Store};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{AdminUser, ApiJson, invalid_id};
use crate::response::{BrandView, Envelope};

#[derive(Deserialize)]
pub struct CreateBrandRequest {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateBrandRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub image: Option<Option<String>>,
}

#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(State(state): State<Arc<AppState<S>>>) -> Result<Envelope, ApiError> {
    let brands = state.catalog.brands().await?;
    let views: Vec<BrandView> = brands.iter().map(BrandView::from).collect();
    Envelope::ok().with("brands", views)
}

#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(slug): Path<String>,
) -> Result<Envelope, ApiError> {
    let brand = state.catalog.brand_by_slug(&slug).await?;
    Envelope::ok().with("brand", BrandView::from(&brand))
}

#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    ApiJson(req): ApiJson<CreateBrandRequest>,
) -> Result<Envelope, ApiError> {
    let brand = state.catalog.create_brand(&req.name, req.image).await?;
    Envelope::ok().with("brand", BrandView::from(&brand))
}

#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id, brand_id = %id))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateBrandRequest>,
) -> Result<Envelope, ApiError> {
    let id = BrandId::parse(&id).map_err(invalid_id)?;
    let patch = BrandPatch {
        name: req.name,
        image: req.image,
    };
    let brand = state.catalog.update_brand(id, patch).await?;
    Envelope::ok().with("brand", BrandView::from(&brand))
}

#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id, brand_id = %id))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Envelope, ApiError> {
    let id = BrandId::parse(&id).map_err(invalid_id)?;
    state.catalog.delete_brand(id).await?;
    Ok(Envelope::ok().message("Brand deleted"))
}
