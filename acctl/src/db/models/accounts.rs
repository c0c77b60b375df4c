//! Database models for accounts.

use crate::types::AccountId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for provisioning an account.
///
/// Accounts are normally created by the account-management service; this is used to seed
/// accounts listed in the configuration file.
#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub username: String,
    pub auth_token: String,
}

/// Database response for an account. The auth token is never read back out.
#[derive(Debug, Clone, FromRow)]
pub struct AccountDBResponse {
    pub id: AccountId,
    pub username: String,
    pub discord_id: Option<String>,
    pub discord_username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
