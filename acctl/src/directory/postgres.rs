//! PostgreSQL-backed account directory.
//!
//! Every resolved handle owns a transaction in which the account row is locked with
//! `SELECT ... FOR UPDATE`. Writes made through the handle become visible on
//! [`AccountHandle::commit`]; dropping an uncommitted handle rolls them back.

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use super::{AccountDirectory, AccountHandle};
use crate::config::AccountSeed;
use crate::db::{
    errors::Result,
    handlers::Accounts,
    models::accounts::{AccountCreateDBRequest, AccountDBResponse},
};
use crate::types::AccountId;

#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ensure every seeded account exists. Existing accounts are left as they are.
    #[instrument(skip_all, fields(count = seeds.len()), err)]
    pub async fn seed(&self, seeds: &[AccountSeed]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let mut accounts = Accounts::new(&mut tx);
        for seed in seeds {
            accounts
                .create_if_missing(&AccountCreateDBRequest {
                    username: seed.username.clone(),
                    auth_token: seed.auth_token.clone(),
                })
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for PostgresDirectory {
    #[instrument(skip_all, err)]
    async fn resolve(&self, token: &str) -> Result<Option<Box<dyn AccountHandle>>> {
        let mut tx = self.pool.begin().await?;
        let account = Accounts::new(&mut tx).get_by_token_for_update(token).await?;

        match account {
            Some(account) => Ok(Some(Box::new(PostgresAccount { tx, account }))),
            None => {
                tx.rollback().await?;
                Ok(None)
            }
        }
    }
}

struct PostgresAccount {
    tx: Transaction<'static, Postgres>,
    account: AccountDBResponse,
}

#[async_trait]
impl AccountHandle for PostgresAccount {
    fn id(&self) -> AccountId {
        self.account.id
    }

    fn display_name(&self) -> &str {
        &self.account.username
    }

    async fn update_identity(&mut self, external_id: &str, external_username: &str) -> Result<()> {
        Accounts::new(&mut self.tx)
            .update_discord(self.account.id, external_id, external_username)
            .await?;
        self.account.discord_id = Some(external_id.to_string());
        self.account.discord_username = Some(external_username.to_string());
        Ok(())
    }

    async fn config_count(&mut self) -> Result<usize> {
        let count = Accounts::new(&mut self.tx).count_configs(self.account.id).await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn put_config(&mut self, filename: &str, content: Bytes) -> Result<()> {
        Accounts::new(&mut self.tx).upsert_config(self.account.id, filename, &content).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
