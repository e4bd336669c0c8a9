//! Registration, login and bearer-token sessions.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use common::UserId;

use crate::error::DomainError;
use crate::ports::{RepositoryError, Store};

use super::{
    Identity, Role, Session, TokenKind, TokenPair, User, generate_token, hash_password,
    verify_password,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_TOKEN: &str = "Invalid or expired token";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

/// Lifetimes of issued tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_ttl: Duration::seconds(900),
            refresh_ttl: Duration::days(7),
        }
    }
}

/// Service for user accounts and sessions.
#[derive(Clone)]
pub struct AuthService<S: Store> {
    store: S,
    settings: TokenSettings,
}

impl<S: Store> AuthService<S> {
    /// Creates a new auth service over the given store.
    pub fn new(store: S, settings: TokenSettings) -> Self {
        Self { store, settings }
    }

    /// Creates a customer account and signs it in.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, TokenPair), DomainError> {
        let user = self.create_user(name, email, password, Role::Customer).await?;
        let tokens = self.issue(&user).await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok((user, tokens))
    }

    /// Exchanges credentials for a token pair.
    ///
    /// Unknown emails and wrong passwords fail identically.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair), DomainError> {
        let email = normalize_email(email);
        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
                return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        let tokens = self.issue(&user).await?;
        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);
        Ok((user, tokens))
    }

    /// Rotates a refresh token: the presented one is consumed and a new
    /// pair is issued.
    #[tracing::instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, DomainError> {
        let session = self
            .store
            .delete_session(refresh_token)
            .await?
            .filter(|s| s.kind == TokenKind::Refresh && !s.is_expired(Utc::now()))
            .ok_or_else(|| DomainError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()))?;

        let user = self
            .store
            .find_user(session.user_id)
            .await?
            .ok_or_else(|| DomainError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()))?;

        self.issue(&user).await
    }

    /// Resolves an access token to the caller's identity.
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self, access_token: &str) -> Result<Identity, DomainError> {
        let session = self
            .store
            .find_session(access_token)
            .await?
            .filter(|s| s.kind == TokenKind::Access)
            .ok_or_else(|| DomainError::Unauthorized(INVALID_TOKEN.to_string()))?;

        if session.is_expired(Utc::now()) {
            self.store.delete_session(access_token).await?;
            return Err(DomainError::Unauthorized(INVALID_TOKEN.to_string()));
        }
        Ok(session.identity())
    }

    /// Revokes an access token and, when given, its refresh token.
    #[tracing::instrument(skip_all)]
    pub async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), DomainError> {
        let identity = self.authenticate(access_token).await?;
        self.store.delete_session(access_token).await?;

        if let Some(token) = refresh_token
            && let Some(session) = self.store.find_session(token).await?
            && session.user_id == identity.user_id
        {
            self.store.delete_session(token).await?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn user(&self, id: UserId) -> Result<User, DomainError> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    /// Looks up several users at once, keyed by id. Unknown ids are absent.
    #[tracing::instrument(skip_all)]
    pub async fn users_by_ids(
        &self,
        ids: impl IntoIterator<Item = UserId>,
    ) -> Result<HashMap<UserId, User>, DomainError> {
        let mut found = HashMap::new();
        for id in ids {
            if found.contains_key(&id) {
                continue;
            }
            if let Some(user) = self.store.find_user(id).await? {
                found.insert(id, user);
            }
        }
        Ok(found)
    }

    /// Makes sure an admin account with this email exists.
    ///
    /// An existing account is promoted; its password is left unchanged.
    #[tracing::instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<User, DomainError> {
        let normalized = normalize_email(email);
        if let Some(mut user) = self.store.find_user_by_email(&normalized).await? {
            if user.role != Role::Admin {
                self.store.set_user_role(user.id, Role::Admin).await?;
                user.role = Role::Admin;
                tracing::info!(user_id = %user.id, "existing user promoted to admin");
            }
            return Ok(user);
        }

        let user = self.create_user("Administrator", email, password, Role::Admin).await?;
        tracing::info!(user_id = %user.id, "admin user created");
        Ok(user)
    }

    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid("Name is required"));
        }
        let email = normalize_email(email);
        if !looks_like_email(&email) {
            return Err(DomainError::invalid("A valid email is required"));
        }
        let password_hash = hash_password(password)?;

        let user = User {
            id: UserId::new(),
            name: name.to_string(),
            email,
            password_hash,
            provider: "local".to_string(),
            role,
            is_verified: false,
            created_at: Utc::now(),
        };

        match self.store.insert_user(&user).await {
            Ok(()) => Ok(user),
            Err(RepositoryError::Duplicate { .. }) => {
                Err(DomainError::Conflict("Email already registered".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn issue(&self, user: &User) -> Result<TokenPair, DomainError> {
        let now = Utc::now();
        let access = Session {
            token: generate_token(),
            user_id: user.id,
            role: user.role,
            kind: TokenKind::Access,
            expires_at: now + self.settings.access_ttl,
        };
        let refresh = Session {
            token: generate_token(),
            user_id: user.id,
            role: user.role,
            kind: TokenKind::Refresh,
            expires_at: now + self.settings.refresh_ttl,
        };

        self.store.insert_session(&access).await?;
        self.store.insert_session(&refresh).await?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            access_expires_at: access.expires_at,
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}
