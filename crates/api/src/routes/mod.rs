//! HTTP handlers, one module per resource.

pub mod auth;
pub mod brands;
pub mod cart;
pub mod categories;
pub mod health;
pub mod lists;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in partial updates.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
