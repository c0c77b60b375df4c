//! In-process account directory.
//!
//! Accounts live in a [`DashMap`] keyed by auth token. Each account sits behind its own
//! [`tokio::sync::Mutex`]; a resolved handle owns the guard, so concurrent requests for the same
//! account queue up while requests for different accounts proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{AccountDirectory, AccountHandle};
use crate::config::AccountSeed;
use crate::db::errors::Result;
use crate::types::{AccountId, abbrev_uuid};

/// Stored state of one account.
#[derive(Debug, Clone, Default)]
pub struct AccountRecord {
    pub id: AccountId,
    pub username: String,
    pub discord_id: Option<String>,
    pub discord_username: Option<String>,
    pub configs: HashMap<String, Bytes>,
}

#[derive(Debug)]
struct StoredAccount {
    id: AccountId,
    record: Arc<Mutex<AccountRecord>>,
}

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    accounts: DashMap<String, StoredAccount>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seeds(seeds: &[AccountSeed]) -> Self {
        let directory = Self::new();
        for seed in seeds {
            directory.register(&seed.auth_token, &seed.username);
        }
        directory
    }

    /// Make `auth_token` resolve to a new account named `username`. Registering a token that is
    /// already known leaves the existing account untouched and returns its id.
    pub fn register(&self, auth_token: &str, username: &str) -> AccountId {
        let entry = self.accounts.entry(auth_token.to_string()).or_insert_with(|| {
            let id = Uuid::new_v4();
            debug!(account_id = %abbrev_uuid(&id), "Registered account");
            StoredAccount {
                id,
                record: Arc::new(Mutex::new(AccountRecord {
                    id,
                    username: username.to_string(),
                    ..Default::default()
                })),
            }
        });
        entry.id
    }

    /// Copy of the account's current state. Waits for any in-flight handle to be released.
    pub async fn snapshot(&self, auth_token: &str) -> Option<AccountRecord> {
        let account = self.accounts.get(auth_token).map(|entry| entry.record.clone())?;
        let record = account.lock().await;
        Some(record.clone())
    }
}

#[async_trait]
impl AccountDirectory for MemoryDirectory {
    #[instrument(skip_all, err)]
    async fn resolve(&self, token: &str) -> Result<Option<Box<dyn AccountHandle>>> {
        // Clone the Arc out so the shard lock is released before awaiting the account lock
        let Some(account) = self.accounts.get(token).map(|entry| entry.record.clone()) else {
            return Ok(None);
        };

        let guard = account.lock_owned().await;
        Ok(Some(Box::new(MemoryAccount { record: guard })))
    }
}

struct MemoryAccount {
    record: OwnedMutexGuard<AccountRecord>,
}

#[async_trait]
impl AccountHandle for MemoryAccount {
    fn id(&self) -> AccountId {
        self.record.id
    }

    fn display_name(&self) -> &str {
        &self.record.username
    }

    async fn update_identity(&mut self, external_id: &str, external_username: &str) -> Result<()> {
        self.record.discord_id = Some(external_id.to_string());
        self.record.discord_username = Some(external_username.to_string());
        Ok(())
    }

    async fn config_count(&mut self) -> Result<usize> {
        Ok(self.record.configs.len())
    }

    async fn put_config(&mut self, filename: &str, content: Bytes) -> Result<()> {
        self.record.configs.insert(filename.to_string(), content);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        // Writes are applied in place; dropping the guard releases the account
        Ok(())
    }
}
