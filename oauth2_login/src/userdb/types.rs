use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::oauth2::Provider;

/// A local account. Uniqueness of `username` and `email` is enforced by
/// the store, not by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Set only for accounts that also hold a password credential.
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new account shell with a fresh uuid and current timestamps.
    pub fn new(username: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Binds one external provider identity to one local account.
/// `(provider, provider_user_id)` is unique across the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountLink {
    pub user_id: String,
    pub provider: Provider,
    pub provider_user_id: String,
    pub created_at: DateTime<Utc>,
}

impl AccountLink {
    pub fn new(user_id: String, provider: Provider, provider_user_id: String) -> Self {
        Self {
            user_id,
            provider,
            provider_user_id,
            created_at: Utc::now(),
        }
    }
}
