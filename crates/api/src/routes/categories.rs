//! Category reads and administration.

use std::sync::Arc;

use axum::extract::{Path, State};
use common::CategoryId;
use domain::{CategoryPatch, Store};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{AdminUser, ApiJson, invalid_id};
use crate::response::{CategoryView, Envelope};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    pub parent_id: Option<String>,
    pub image: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub parent_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub image: Option<Option<String>>,
}

/// GET /api/categories: newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(State(state): State<Arc<AppState<S>>>) -> Result<Envelope, ApiError> {
    let categories = state.catalog.categories().await?;
    let views: Vec<CategoryView> = categories.iter().map(CategoryView::from).collect();
    Envelope::ok().with("categories", views)
}

/// GET /api/categories/{slug}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(slug): Path<String>,
) -> Result<Envelope, ApiError> {
    let category = state.catalog.category_by_slug(&slug).await?;
    Envelope::ok().with("category", CategoryView::from(&category))
}

#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    ApiJson(req): ApiJson<CreateCategoryRequest>,
) -> Result<Envelope, ApiError> {
    let parent = req
        .parent_id
        .as_deref()
        .map(CategoryId::parse)
        .transpose()
        .map_err(invalid_id)?;

    let category = state
        .catalog
        .create_category(&req.name, parent, req.image)
        .await?;
    Envelope::ok().with("category", CategoryView::from(&category))
}

/// PATCH /api/categories/{id}
#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id, category_id = %id))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateCategoryRequest>,
) -> Result<Envelope, ApiError> {
    let id = CategoryId::parse(&id).map_err(invalid_id)?;
    let parent_id = match req.parent_id {
        Some(Some(raw)) => Some(Some(CategoryId::parse(&raw).map_err(invalid_id)?)),
        Some(None) => Some(None),
        None => None,
    };

    let patch = CategoryPatch {
        name: req.name,
        parent_id,
        image: req.image,
    };
    let category = state.catalog.update_category(id, patch).await?;
    Envelope::ok().with("category", CategoryView::from(&category))
}

/// DELETE /api/categories/{id}: children are detached, products untouched.
#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id, category_id = %id))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Envelope, ApiError> {
    let id = CategoryId::parse(&id).map_err(invalid_id)?;
    state.catalog.delete_category(id).await?;
    Ok(Envelope::ok().message("Category deleted"))
}
