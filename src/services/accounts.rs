// src/services/accounts.rs
use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::models::{Account, NewAccount};
use crate::common::safe_email_log;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an account with this email already exists")]
    UniqueViolation,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Account storage. Email is unique; `insert` reports a clash as [`StoreError::UniqueViolation`].
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;

    async fn insert(&self, account: &NewAccount) -> Result<Account, StoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteAccountStore {
    db_pool: SqlitePool,
}

impl SqliteAccountStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, name, phone, created_at, updated_at";

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE email = ?", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(account)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = ?", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(account)
    }

    async fn insert(&self, account: &NewAccount) -> Result<Account, StoreError> {
        let query = format!(
            "INSERT INTO users (email, name, created_at) \
             VALUES (?, ?, datetime('now')) RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let result = sqlx::query_as::<_, Account>(&query)
            .bind(&account.email)
            .bind(account.display_name.as_deref())
            .fetch_one(&self.db_pool)
            .await;

        match result {
            Ok(created) => {
                debug!(account_id = created.id, "Inserted new account");
                Ok(created)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!(
                    email = %safe_email_log(&account.email),
                    "Account insert hit unique email constraint"
                );
                Err(StoreError::UniqueViolation)
            }
            Err(e) => {
                error!(
                    error = %e,
                    email = %safe_email_log(&account.email),
                    "Database error inserting account"
                );
                Err(StoreError::Database(e))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::memory_pool;
    use super::*;

    fn new_account(email: &str, name: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            display_name: Some(name.to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = SqliteAccountStore::new(memory_pool().await);

        let created = store
            .insert(&new_account("a@example.com", "A"))
            .await
            .expect("insert");
        assert_eq!(created.email, "a@example.com");
        assert_eq!(created.display_name.as_deref(), Some("A"));
        assert!(!created.created_at.is_empty());

        let by_email = store.find_by_email("a@example.com").await.expect("find");
        assert_eq!(by_email, Some(created.clone()));

        let by_id = store.find_by_id(created.id).await.expect("find");
        assert_eq!(by_id, Some(created));
    }

    #[tokio::test]
    async fn test_missing_account_is_none() {
        let store = SqliteAccountStore::new(memory_pool().await);

        assert!(store.find_by_email("nobody@example.com").await.unwrap().is_none());
        assert!(store.find_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let store = SqliteAccountStore::new(memory_pool().await);

        store.insert(&new_account("a@example.com", "A")).await.unwrap();
        let second = store.insert(&new_account("a@example.com", "Other")).await;

        assert!(matches!(second, Err(StoreError::UniqueViolation)));
    }
}
