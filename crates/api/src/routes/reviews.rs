//! Product reviews.

use std::sync::Arc;

use axum::extract::{Path, State};
use common::{ProductId, ReviewId};
use domain::Store;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{AdminUser, ApiJson, AuthUser, invalid_id};
use crate::response::{Envelope, RatingView, ReviewView};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    pub product_id: String,
    pub rating: i64,
    #[serde(default)]
    pub text: String,
}

/// POST /api/reviews: creates the caller's review or replaces it.
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn submit<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<SubmitReviewRequest>,
) -> Result<Envelope, ApiError> {
    let product_id = ProductId::parse(&req.product_id).map_err(invalid_id)?;
    let (review, summary) = state
        .reviews
        .submit(user.identity.user_id, product_id, req.rating, &req.text)
        .await?;

    Envelope::ok()
        .with("review", ReviewView::from(&review))?
        .with("rating", RatingView::from(summary))
}

/// GET /api/reviews/{productId}: newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<String>,
) -> Result<Envelope, ApiError> {
    let product_id = ProductId::parse(&product_id).map_err(invalid_id)?;
    let reviews = state.reviews.list(product_id).await?;
    let authors = state
        .auth
        .users_by_ids(reviews.iter().map(|r| r.author_id).collect::<Vec<_>>())
        .await?;
    let views: Vec<ReviewView> = reviews
        .iter()
        .map(|r| ReviewView::from(r).with_author(authors.get(&r.author_id)))
        .collect();
    Envelope::ok().with("reviews", views)
}

/// DELETE /api/reviews/{id}: only the author's own review.
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id, review_id = %id))]
pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope, ApiError> {
    let id = ReviewId::parse(&id).map_err(invalid_id)?;
    let (review, summary) = state.reviews.remove(user.identity.user_id, id).await?;

    Ok(Envelope::ok()
        .with("review", ReviewView::from(&review))?
        .with("rating", RatingView::from(summary))?
        .message("Review removed"))
}

/// DELETE /api/reviews/admin/{id}
#[tracing::instrument(skip_all, fields(admin = %admin.0.user_id, review_id = %id))]
pub async fn remove_any<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Envelope, ApiError> {
    let id = ReviewId::parse(&id).map_err(invalid_id)?;
    let (review, summary) = state.reviews.remove_any(id).await?;

    Ok(Envelope::ok()
        .with("review", ReviewView::from(&review))?
        .with("rating", RatingView::from(summary))?
        .message("Review removed"))
}
