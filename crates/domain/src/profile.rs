//! User profile with list and cart counters.

use common::UserId;

use crate::error::DomainError;
use crate::identity::User;
use crate::lists::ListKind;
use crate::money::Money;
use crate::ports::Store;

/// Number of entries in each of a user's collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileCounts {
    pub favorites: usize,
    pub compare: usize,
    /// Distinct cart lines, not units.
    pub cart: usize,
}

/// A user together with their collection counters.
#[derive(Debug, Clone)]
pub struct Profile {
    pub user: User,
    pub counts: ProfileCounts,
    pub cart_total: Money,
}

/// Read-only profile queries. Missing collections count as empty and are
/// not created.
#[derive(Clone)]
pub struct ProfileService<S: Store> {
    store: S,
}

impl<S: Store> ProfileService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn profile(&self, user_id: UserId) -> Result<Profile, DomainError> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))?;

        let favorites = self.store.find_list(user_id, ListKind::Favorites).await?;
        let compare = self.store.find_list(user_id, ListKind::Compare).await?;
        let cart = self.store.find_cart(user_id).await?;

        let counts = ProfileCounts {
            favorites: favorites.as_ref().map_or(0, |l| l.len()),
            compare: compare.as_ref().map_or(0, |l| l.len()),
            cart: cart.as_ref().map_or(0, |c| c.line_count()),
        };
        let cart_total = cart.map_or_else(Money::zero, |c| c.total());

        Ok(Profile {
            user,
            counts,
            cart_total,
        })
    }
}
