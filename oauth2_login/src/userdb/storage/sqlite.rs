use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Row, SqliteConnection};

use crate::oauth2::Provider;

use super::super::errors::UserError;
use super::super::store::UserStore;
use super::super::types::{AccountLink, User};

/// SQLite-backed store. The schema carries the unique indexes account
/// resolution relies on.
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub async fn connect(url: &str) -> Result<Self, UserError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| UserError::Storage(e.to_string()))?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> Result<(), UserError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );

            CREATE TABLE IF NOT EXISTS account_links (
                user_id TEXT NOT NULL REFERENCES users(id),
                provider TEXT NOT NULL,
                provider_user_id TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL,
                UNIQUE(provider, provider_user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_account_links_user
                ON account_links(user_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }
}

fn map_err(e: sqlx::Error) -> UserError {
    match &e {
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation => {
            UserError::UniqueViolation(db.message().to_string())
        }
        _ => UserError::Storage(e.to_string()),
    }
}

async fn insert_link(
    conn: &mut SqliteConnection,
    link: &AccountLink,
) -> Result<(), UserError> {
    sqlx::query(
        "INSERT INTO account_links (user_id, provider, provider_user_id, created_at) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(&link.user_id)
    .bind(link.provider.as_str())
    .bind(&link.provider_user_id)
    .bind(link.created_at)
    .execute(conn)
    .await
    .map_err(map_err)?;
    Ok(())
}

async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<(), UserError> {
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(conn)
    .await
    .map_err(map_err)?;
    Ok(())
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, UserError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn find_by_link(
        &self,
        provider: Provider,
        provider_user_id: &str,
    ) -> Result<Option<User>, UserError> {
        sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u \
             JOIN account_links l ON l.user_id = u.id \
             WHERE l.provider = ? AND l.provider_user_id = ?",
        )
        .bind(provider.as_str())
        .bind(provider_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn links_for_user(&self, user_id: &str) -> Result<Vec<AccountLink>, UserError> {
        let rows = sqlx::query(
            "SELECT user_id, provider, provider_user_id, created_at \
             FROM account_links WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        rows.into_iter()
            .map(|row| {
                let provider: String = row.get("provider");
                let provider = provider
                    .parse::<Provider>()
                    .map_err(|_| UserError::Storage(format!("unknown provider row: {provider}")))?;
                Ok(AccountLink {
                    user_id: row.get("user_id"),
                    provider,
                    provider_user_id: row.get("provider_user_id"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    async fn add_link(&self, link: &AccountLink) -> Result<(), UserError> {
        let mut conn = self.pool.acquire().await.map_err(map_err)?;
        insert_link(&mut conn, link).await
    }

    async fn create_user_with_link(
        &self,
        user: &User,
        link: &AccountLink,
    ) -> Result<(), UserError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        insert_user(&mut tx, user).await?;
        insert_link(&mut tx, link).await?;
        tx.commit().await.map_err(map_err)?;
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<(), UserError> {
        let mut conn = self.pool.acquire().await.map_err(map_err)?;
        insert_user(&mut conn, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // In-memory SQLite needs a single connection or each checkout sees a
    // different empty database.
    async fn store() -> SqliteUserStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteUserStore::from_pool(pool);
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_create_and_find_by_link() {
        let store = store().await;
        let user = User::new("jane".to_string(), "jane@example.com".to_string());
        let link = AccountLink::new(user.id.clone(), Provider::GitHub, "42".to_string());

        store.create_user_with_link(&user, &link).await.unwrap();

        let found = store
            .find_by_link(Provider::GitHub, "42")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);

        assert!(store.find_by_link(Provider::Google, "42").await.unwrap().is_none());
        assert!(store.find_by_link(Provider::GitHub, "43").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_email() {
        let store = store().await;
        let user = User::new("jane".to_string(), "jane@example.com".to_string());
        store.create_user(&user).await.unwrap();

        let found = store.find_by_email("jane@example.com").await.unwrap().unwrap();
        assert_eq!(found.username, "jane");
        assert!(store.find_by_email("other@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_username_unique_violation_is_detected() {
        let store = store().await;
        store
            .create_user(&User::new("jane".to_string(), "a@example.com".to_string()))
            .await
            .unwrap();

        let err = store
            .create_user(&User::new("jane".to_string(), "b@example.com".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_username_conflict());
    }

    #[tokio::test]
    async fn test_email_unique_violation_is_not_a_username_conflict() {
        let store = store().await;
        store
            .create_user(&User::new("jane".to_string(), "a@example.com".to_string()))
            .await
            .unwrap();

        let err = store
            .create_user(&User::new("janet".to_string(), "a@example.com".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(&err, UserError::UniqueViolation(_)));
        assert!(!err.is_username_conflict());
    }

    #[tokio::test]
    async fn test_duplicate_link_rejected() {
        let store = store().await;
        let user = User::new("jane".to_string(), "a@example.com".to_string());
        let link = AccountLink::new(user.id.clone(), Provider::Google, "g-1".to_string());
        store.create_user_with_link(&user, &link).await.unwrap();

        let other = User::new("janet".to_string(), "b@example.com".to_string());
        store.create_user(&other).await.unwrap();
        let dup = AccountLink::new(other.id.clone(), Provider::Google, "g-1".to_string());
        let err = store.add_link(&dup).await.unwrap_err();
        assert!(matches!(err, UserError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_failed_create_rolls_back_user_row() {
        let store = store().await;
        let user = User::new("jane".to_string(), "a@example.com".to_string());
        let link = AccountLink::new(user.id.clone(), Provider::GitHub, "42".to_string());
        store.create_user_with_link(&user, &link).await.unwrap();

        // Same link, fresh user: the link insert fails, the user insert
        // must not survive.
        let other = User::new("janet".to_string(), "b@example.com".to_string());
        let dup = AccountLink::new(other.id.clone(), Provider::GitHub, "42".to_string());
        assert!(store.create_user_with_link(&other, &dup).await.is_err());
        assert!(store.find_by_email("b@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_links_for_user() {
        let store = store().await;
        let user = User::new("jane".to_string(), "a@example.com".to_string());
        let link = AccountLink::new(user.id.clone(), Provider::GitHub, "42".to_string());
        store.create_user_with_link(&user, &link).await.unwrap();
        store
            .add_link(&AccountLink::new(user.id.clone(), Provider::Google, "g-1".to_string()))
            .await
            .unwrap();

        let links = store.links_for_user(&user.id).await.unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().any(|l| l.provider == Provider::GitHub));
        assert!(links.iter().any(|l| l.provider == Provider::Google));
    }
}
