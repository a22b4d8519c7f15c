use async_trait::async_trait;

use crate::oauth2::Provider;

use super::errors::UserError;
use super::types::{AccountLink, User};

/// Persistence boundary for accounts and provider links.
///
/// Implementations enforce the unique indexes on `username`, `email` and
/// `(provider, provider_user_id)`; callers lean on `UniqueViolation`
/// rather than check-then-write races.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>, UserError>;

    async fn find_by_link(
        &self,
        provider: Provider,
        provider_user_id: &str,
    ) -> Result<Option<User>, UserError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;

    async fn links_for_user(&self, user_id: &str) -> Result<Vec<AccountLink>, UserError>;

    async fn add_link(&self, link: &AccountLink) -> Result<(), UserError>;

    /// Insert the user and its first link atomically. Either both rows
    /// land or neither does.
    async fn create_user_with_link(
        &self,
        user: &User,
        link: &AccountLink,
    ) -> Result<(), UserError>;

    /// Insert a bare account, used for password-credential signups.
    async fn create_user(&self, user: &User) -> Result<(), UserError>;
}
