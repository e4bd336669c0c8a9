//! The caller's own profile.

use std::sync::Arc;

use axum::extract::State;
use domain::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::response::{Envelope, ProfileView};

/// GET /api/users/profile: account details with list and cart counters.
#[tracing::instrument(skip_all, fields(user_id = %user.identity.user_id))]
pub async fn profile<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Envelope, ApiError> {
    let profile = state.profiles.profile(user.identity.user_id).await?;
    Envelope::ok().with("profile", ProfileView::from(&profile))
}
