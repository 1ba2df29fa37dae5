//! Maps an external identity onto a local account, creating it on first login

use std::sync::Arc;
use tracing::{debug, error, info};

use super::models::{Account, ExternalIdentity, NewAccount};
use crate::common::safe_email_log;
use crate::services::accounts::{AccountStore, StoreError};

#[derive(Clone)]
pub struct AccountResolver {
    store: Arc<dyn AccountStore>,
}

impl AccountResolver {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Returns the account for `identity.email`, creating it if absent.
    ///
    /// Existing accounts are returned untouched. Concurrent first logins are
    /// settled by the store's unique email constraint: the loser re-reads once.
    pub async fn resolve_or_create(
        &self,
        identity: &ExternalIdentity,
    ) -> Result<Account, StoreError> {
        let email = normalize_email(&identity.email);

        if let Some(existing) = self.store.find_by_email(&email).await? {
            debug!(
                account_id = existing.id,
                provider = identity.provider.as_str(),
                "Resolved existing account"
            );
            return Ok(existing);
        }

        let display_name = Some(identity.display_name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let new_account = NewAccount {
            email: email.clone(),
            display_name,
        };

        match self.store.insert(&new_account).await {
            Ok(created) => {
                info!(
                    account_id = created.id,
                    email = %safe_email_log(&created.email),
                    provider = identity.provider.as_str(),
                    "Created account on first login"
                );
                Ok(created)
            }
            Err(StoreError::UniqueViolation) => {
                debug!(
                    email = %safe_email_log(&email),
                    "Concurrent login created the account first, re-reading"
                );
                self.store.find_by_email(&email).await?.ok_or_else(|| {
                    error!(
                        email = %safe_email_log(&email),
                        "Account vanished after unique violation"
                    );
                    StoreError::UniqueViolation
                })
            }
            Err(e) => Err(e),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Provider;
    use crate::services::accounts::test_support::memory_pool;
    use crate::services::accounts::SqliteAccountStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    fn identity(email: &str, name: &str) -> ExternalIdentity {
        ExternalIdentity {
            provider: Provider::Google,
            provider_subject: "123".to_string(),
            email: email.to_string(),
            email_verified: true,
            display_name: name.to_string(),
            avatar_url: String::new(),
        }
    }

    async fn sqlite_resolver() -> (AccountResolver, Arc<SqliteAccountStore>) {
        let store = Arc::new(SqliteAccountStore::new(memory_pool().await));
        (AccountResolver::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_creates_account_once() {
        let (resolver, _) = sqlite_resolver().await;

        let first = resolver
            .resolve_or_create(&identity("a@example.com", "A"))
            .await
            .unwrap();
        let second = resolver
            .resolve_or_create(&identity("a@example.com", "A"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.email, "a@example.com");
        assert_eq!(first.display_name.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_email_case_is_ignored() {
        let (resolver, _) = sqlite_resolver().await;

        let first = resolver
            .resolve_or_create(&identity("A@Example.com", "A"))
            .await
            .unwrap();
        let second = resolver
            .resolve_or_create(&identity("a@example.com ", "A"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_existing_display_name_is_kept() {
        let (resolver, store) = sqlite_resolver().await;
        let edited = store
            .insert(&NewAccount {
                email: "a@example.com".to_string(),
                display_name: Some("Edited By Hand".to_string()),
            })
            .await
            .unwrap();

        let resolved = resolver
            .resolve_or_create(&identity("a@example.com", "Name From Google"))
            .await
            .unwrap();

        assert_eq!(resolved, edited);
        let stored = store.find_by_id(edited.id).await.unwrap().unwrap();
        assert_eq!(stored.display_name.as_deref(), Some("Edited By Hand"));
    }

    #[tokio::test]
    async fn test_concurrent_logins_share_one_account() {
        let (resolver, _) = sqlite_resolver().await;
        let id_a = identity("new@example.com", "New");
        let id_b = identity("new@example.com", "New");

        let (a, b) = tokio::join!(
            resolver.resolve_or_create(&id_a),
            resolver.resolve_or_create(&id_b)
        );

        assert_eq!(a.unwrap().id, b.unwrap().id);
    }

    /// Store where another request always wins the insert race.
    struct RacingStore {
        winner: Account,
        finds: AtomicUsize,
        inserts: AtomicUsize,
        inserted: Mutex<bool>,
    }

    #[async_trait]
    impl AccountStore for RacingStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, StoreError> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            if *self.inserted.lock().await {
                Ok(Some(self.winner.clone()))
            } else {
                Ok(None)
            }
        }

        async fn find_by_id(&self, _id: i64) -> Result<Option<Account>, StoreError> {
            Ok(None)
        }

        async fn insert(&self, _account: &NewAccount) -> Result<Account, StoreError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            *self.inserted.lock().await = true;
            Err(StoreError::UniqueViolation)
        }
    }

    #[tokio::test]
    async fn test_unique_violation_refetches_once() {
        let winner = Account {
            id: 7,
            email: "race@example.com".to_string(),
            display_name: Some("Winner".to_string()),
            phone: None,
            created_at: "2024-01-01 00:00:00".to_string(),
            updated_at: None,
        };
        let store = Arc::new(RacingStore {
            winner: winner.clone(),
            finds: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            inserted: Mutex::new(false),
        });
        let resolver = AccountResolver::new(store.clone());

        let resolved = resolver
            .resolve_or_create(&identity("race@example.com", "Loser"))
            .await
            .unwrap();

        assert_eq!(resolved, winner);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(store.finds.load(Ordering::SeqCst), 2);
    }
}
