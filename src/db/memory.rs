use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{Account, NewAccount};
use crate::db::store::CredentialStore;
use crate::error::DatabaseError;

/// In-process [`CredentialStore`]. The uniqueness check and the insert happen
/// under a single write lock, which gives the same all-or-nothing behaviour
/// as the database constraint. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DatabaseError> {
        Ok(self.accounts.read().await.get(username).cloned())
    }

    async fn save(&self, account: NewAccount) -> Result<Account, DatabaseError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.username) {
            return Err(DatabaseError::Duplicate);
        }

        let saved = account.into_account(Uuid::new_v4(), Utc::now());
        accounts.insert(saved.username.clone(), saved.clone());
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_save_assigns_id_and_finds_by_username() {
        let store = MemoryCredentialStore::new();
        let saved = store
            .save(NewAccount::new("alice".into(), "hash".into()).with_roles(["ROLE_USER"]))
            .await
            .unwrap();

        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found, saved);
        assert!(found.roles.contains("ROLE_USER"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_usernames_are_case_sensitive() {
        let store = MemoryCredentialStore::new();
        store.save(NewAccount::new("Alice".into(), "h1".into())).await.unwrap();

        assert!(store.find_by_username("alice").await.unwrap().is_none());
        store.save(NewAccount::new("alice".into(), "h2".into())).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_save_keeps_original() {
        let store = MemoryCredentialStore::new();
        store.save(NewAccount::new("bob".into(), "first".into())).await.unwrap();

        let err = store.save(NewAccount::new("bob".into(), "second".into())).await.unwrap_err();
        assert_eq!(err, DatabaseError::Duplicate);

        let found = store.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "first");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_admit_exactly_one() {
        let store = Arc::new(MemoryCredentialStore::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.save(NewAccount::new("racer".into(), format!("hash-{}", i))).await
                })
            })
            .collect();

        let mut successes = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(DatabaseError::Duplicate) => duplicates += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(duplicates, 15);
        assert_eq!(store.len().await, 1);
    }
}
