//! Database repository for accounts and their configuration slots.

use crate::db::{
    errors::{DbError, Result},
    models::accounts::{AccountCreateDBRequest, AccountDBResponse},
};
use crate::types::{AccountId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

const ACCOUNT_COLUMNS: &str = "id, username, discord_id, discord_username, created_at, updated_at";

pub struct Accounts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Accounts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert the account unless one with the same token already exists. Returns the stored row
    /// either way.
    #[instrument(skip(self, request), fields(username = %request.username), err)]
    pub async fn create_if_missing(&mut self, request: &AccountCreateDBRequest) -> Result<AccountDBResponse> {
        let inserted = sqlx::query_as::<_, AccountDBResponse>(&format!(
            "INSERT INTO accounts (username, auth_token) VALUES ($1, $2)
             ON CONFLICT ON CONSTRAINT accounts_auth_token_unique DO NOTHING
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(&request.username)
        .bind(&request.auth_token)
        .fetch_optional(&mut *self.db)
        .await?;

        if let Some(account) = inserted {
            return Ok(account);
        }

        sqlx::query_as::<_, AccountDBResponse>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE auth_token = $1"))
            .bind(&request.auth_token)
            .fetch_one(&mut *self.db)
            .await
            .map_err(DbError::from)
    }

    /// Look up an account by auth token and lock its row until the surrounding transaction ends.
    #[instrument(skip_all, err)]
    pub async fn get_by_token_for_update(&mut self, auth_token: &str) -> Result<Option<AccountDBResponse>> {
        let account = sqlx::query_as::<_, AccountDBResponse>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE auth_token = $1 FOR UPDATE"
        ))
        .bind(auth_token)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(account)
    }

    #[instrument(skip(self, discord_id, discord_username), fields(account_id = %abbrev_uuid(&id)), err)]
    pub async fn update_discord(&mut self, id: AccountId, discord_id: &str, discord_username: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE accounts SET discord_id = $2, discord_username = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(discord_id)
        .bind(discord_username)
        .execute(&mut *self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    pub async fn count_configs(&mut self, id: AccountId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM account_configs WHERE account_id = $1")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    /// Insert the slot, or replace its content when the filename is already taken.
    #[instrument(skip(self, content), fields(account_id = %abbrev_uuid(&id), size = content.len()), err)]
    pub async fn upsert_config(&mut self, id: AccountId, filename: &str, content: &[u8]) -> Result<()> {
        sqlx::query(
            "INSERT INTO account_configs (account_id, filename, content, size_bytes)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (account_id, filename)
             DO UPDATE SET content = EXCLUDED.content, size_bytes = EXCLUDED.size_bytes, updated_at = NOW()",
        )
        .bind(id)
        .bind(filename)
        .bind(content)
        .bind(content.len() as i64)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }

    #[cfg(test)]
    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    pub async fn get_config(&mut self, id: AccountId, filename: &str) -> Result<Option<Vec<u8>>> {
        let content = sqlx::query_scalar::<_, Vec<u8>>("SELECT content FROM account_configs WHERE account_id = $1 AND filename = $2")
            .bind(id)
            .bind(filename)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(content)
    }
}
