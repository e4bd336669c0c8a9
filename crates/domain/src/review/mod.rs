//! Product reviews and rating aggregation.

mod service;

use chrono::{DateTime, Utc};
use common::{ProductId, ReviewId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

pub use service::ReviewService;

/// A star rating between 1 and 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validates a raw rating.
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(DomainError::invalid(format!(
                "Rating must be an integer between {} and {}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    /// Returns the rating value.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// A user's review of a product. At most one exists per (author, product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub author_id: UserId,
    pub rating: Rating,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate rating of a product, derived from all of its reviews.
///
/// The average is kept in tenths so that the rounded value is exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSummary {
    average_tenths: u32,
    count: u32,
}

impl RatingSummary {
    /// Recomputes the summary from every rating of a product.
    ///
    /// The mean is rounded half away from zero to one decimal place.
    /// No ratings yields a zero average and count.
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = Rating>,
    {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0u64), |(sum, count), r| {
                (sum + u64::from(r.value()), count + 1)
            });

        if count == 0 {
            return Self::default();
        }

        let average_tenths = (sum * 20 + count) / (count * 2);
        Self {
            average_tenths: average_tenths as u32,
            count: count as u32,
        }
    }

    /// Restores a previously computed summary.
    pub fn from_parts(average_tenths: u32, count: u32) -> Self {
        Self {
            average_tenths,
            count,
        }
    }

    /// Average rating rounded to one decimal place.
    pub fn average(&self) -> f64 {
        f64::from(self.average_tenths) / 10.0
    }

    /// Average rating in tenths of a star.
    pub fn average_tenths(&self) -> u32 {
        self.average_tenths
    }

    /// Number of reviews the average was computed over.
    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(values: &[i64]) -> Vec<Rating> {
        values.iter().map(|v| Rating::new(*v).unwrap()).collect()
    }

    #[test]
    fn rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-3).is_err());
        assert_eq!(Rating::new(1).unwrap().value(), 1);
        assert_eq!(Rating::new(5).unwrap().value(), 5);
    }

    #[test]
    fn rating_rejects_out_of_range_json() {
        assert!(serde_json::from_str::<Rating>("6").is_err());
        assert_eq!(serde_json::from_str::<Rating>("4").unwrap().value(), 4);
    }

    #[test]
    fn empty_summary_is_zero() {
        let summary = RatingSummary::from_ratings(Vec::new());
        assert_eq!(summary.count(), 0);
        assert_eq!(summary.average(), 0.0);
    }

    #[test]
    fn average_rounds_to_one_decimal() {
        assert_eq!(RatingSummary::from_ratings(ratings(&[4, 5])).average(), 4.5);
        assert_eq!(RatingSummary::from_ratings(ratings(&[4, 4, 5])).average(), 4.3);
        assert_eq!(RatingSummary::from_ratings(ratings(&[5, 5, 4])).average(), 4.7);
    }

    #[test]
    fn average_rounds_half_up() {
        // 7 / 4 = 1.75
        let summary = RatingSummary::from_ratings(ratings(&[1, 1, 2, 3]));
        assert_eq!(summary.average_tenths(), 18);
        assert_eq!(summary.count(), 4);
    }

    #[test]
    fn single_rating_is_exact() {
        let summary = RatingSummary::from_ratings(ratings(&[3]));
        assert_eq!(summary.average(), 3.0);
        assert_eq!(summary.count(), 1);
    }
}
