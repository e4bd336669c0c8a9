//! Review service: one review per author and product, with the product's
//! rating aggregate recomputed after every write.

use chrono::Utc;
use common::{ProductId, ReviewId, UserId};

use crate::error::DomainError;
use crate::ports::{RepositoryError, Store};

use super::{Rating, RatingSummary, Review};

/// Service for submitting and removing product reviews.
#[derive(Clone)]
pub struct ReviewService<S: Store> {
    store: S,
}

impl<S: Store> ReviewService<S> {
    /// Creates a new review service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates or replaces the author's review of a product.
    ///
    /// Returns the stored review and the product's recomputed aggregate.
    #[tracing::instrument(skip(self, text))]
    pub async fn submit(
        &self,
        author: UserId,
        product_id: ProductId,
        rating: i64,
        text: &str,
    ) -> Result<(Review, RatingSummary), DomainError> {
        let rating = Rating::new(rating)?;

        if self.store.find_product(product_id).await?.is_none() {
            return Err(DomainError::not_found("Product", product_id));
        }

        let now = Utc::now();
        let review = match self.store.find_review_by_author(author, product_id).await? {
            Some(existing) => self.replace(existing, rating, text).await?,
            None => {
                let review = Review {
                    id: ReviewId::new(),
                    product_id,
                    author_id: author,
                    rating,
                    text: text.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                match self.store.insert_review(&review).await {
                    Ok(()) => review,
                    // Lost a race with a concurrent first submission; ours replaces it.
                    Err(RepositoryError::Duplicate { .. }) => {
                        let existing = self
                            .store
                            .find_review_by_author(author, product_id)
                            .await?
                            .ok_or_else(|| DomainError::not_found("Review", product_id))?;
                        self.replace(existing, rating, text).await?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let summary = self.recompute(product_id).await?;
        metrics::counter!("reviews_submitted_total").increment(1);
        Ok((review, summary))
    }

    /// Deletes a review written by `author`.
    ///
    /// Returns the deleted review and the product's recomputed aggregate.
    #[tracing::instrument(skip(self))]
    pub async fn remove(
        &self,
        author: UserId,
        review_id: ReviewId,
    ) -> Result<(Review, RatingSummary), DomainError> {
        self.delete(review_id, Some(author)).await
    }

    /// Deletes any review regardless of its author.
    #[tracing::instrument(skip(self))]
    pub async fn remove_any(
        &self,
        review_id: ReviewId,
    ) -> Result<(Review, RatingSummary), DomainError> {
        self.delete(review_id, None).await
    }

    /// Reviews of a product, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, product_id: ProductId) -> Result<Vec<Review>, DomainError> {
        Ok(self.store.list_reviews_for_product(product_id).await?)
    }

    async fn replace(
        &self,
        mut review: Review,
        rating: Rating,
        text: &str,
    ) -> Result<Review, DomainError> {
        review.rating = rating;
        review.text = text.to_string();
        review.updated_at = Utc::now();
        if !self.store.update_review(&review).await? {
            return Err(DomainError::not_found("Review", review.id));
        }
        Ok(review)
    }

    async fn delete(
        &self,
        review_id: ReviewId,
        author: Option<UserId>,
    ) -> Result<(Review, RatingSummary), DomainError> {
        let removed = self
            .store
            .delete_review(review_id, author)
            .await?
            .ok_or_else(|| DomainError::not_found("Review", review_id))?;

        let summary = self.recompute(removed.product_id).await?;
        metrics::counter!("reviews_removed_total").increment(1);
        Ok((removed, summary))
    }

    /// Rebuilds the product's rating from its full review set.
    async fn recompute(&self, product_id: ProductId) -> Result<RatingSummary, DomainError> {
        let ratings = self.store.ratings_for_product(product_id).await?;
        let summary = RatingSummary::from_ratings(ratings);
        self.store.set_product_rating(product_id, summary).await?;

        tracing::debug!(
            product_id = %product_id,
            average = summary.average(),
            count = summary.count(),
            "rating recomputed"
        );
        Ok(summary)
    }
}
