use std::sync::Mutex;

use async_trait::async_trait;

use crate::oauth2::Provider;

use super::super::errors::UserError;
use super::super::store::UserStore;
use super::super::types::{AccountLink, User};

/// In-memory store for demos and tests. Enforces the same unique indexes
/// as the SQLite schema, with matching violation messages.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    links: Vec<AccountLink>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn check_user_unique(&self, user: &User) -> Result<(), UserError> {
        if self.users.iter().any(|u| u.username == user.username) {
            return Err(UserError::UniqueViolation(
                "UNIQUE constraint failed: users.username".to_string(),
            ));
        }
        if self.users.iter().any(|u| u.email == user.email) {
            return Err(UserError::UniqueViolation(
                "UNIQUE constraint failed: users.email".to_string(),
            ));
        }
        Ok(())
    }

    fn check_link_unique(&self, link: &AccountLink) -> Result<(), UserError> {
        let taken = self.links.iter().any(|l| {
            l.provider == link.provider && l.provider_user_id == link.provider_user_id
        });
        if taken {
            return Err(UserError::UniqueViolation(
                "UNIQUE constraint failed: account_links.provider, account_links.provider_user_id"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, UserError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_link(
        &self,
        provider: Provider,
        provider_user_id: &str,
    ) -> Result<Option<User>, UserError> {
        let inner = self.inner.lock().unwrap();
        let user_id = inner
            .links
            .iter()
            .find(|l| l.provider == provider && l.provider_user_id == provider_user_id)
            .map(|l| l.user_id.clone());
        Ok(user_id.and_then(|id| inner.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn links_for_user(&self, user_id: &str) -> Result<Vec<AccountLink>, UserError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .links
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_link(&self, link: &AccountLink) -> Result<(), UserError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_link_unique(link)?;
        inner.links.push(link.clone());
        Ok(())
    }

    async fn create_user_with_link(
        &self,
        user: &User,
        link: &AccountLink,
    ) -> Result<(), UserError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_user_unique(user)?;
        inner.check_link_unique(link)?;
        inner.users.push(user.clone());
        inner.links.push(link.clone());
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<(), UserError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_user_unique(user)?;
        inner.users.push(user.clone());
        Ok(())
    }
}
