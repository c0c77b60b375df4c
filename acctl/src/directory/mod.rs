//! Account directory abstraction.
//!
//! The directory resolves an opaque authorization token to a handle on the owning account. The
//! handle exposes exactly what the ingestion core needs: the linked Discord identity, the number
//! of stored configuration slots, and a way to write a slot.
//!
//! A handle is also the per-account serialization point. While a handle is alive no other
//! request can resolve the same account, so the configuration-count check and the following
//! write observe a consistent count even when uploads for one account race each other.
//!
//! Two implementations are provided:
//!
//! - [`memory::MemoryDirectory`]: process-local map, one async mutex per account
//! - [`postgres::PostgresDirectory`]: one transaction per handle, account row locked `FOR UPDATE`

use async_trait::async_trait;
use bytes::Bytes;

use crate::db::errors::Result;
use crate::types::AccountId;

pub mod memory;
pub mod postgres;

pub use memory::MemoryDirectory;
pub use postgres::PostgresDirectory;

/// Resolves authorization tokens to accounts.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Look up the account owning `token`. Returns `Ok(None)` when the token is unknown.
    ///
    /// The lookup itself has no side effects, but the returned handle holds the account's
    /// serialization point until it is committed or dropped.
    async fn resolve(&self, token: &str) -> Result<Option<Box<dyn AccountHandle>>>;
}

/// Exclusive access to one account for the duration of a request.
#[async_trait]
pub trait AccountHandle: Send {
    fn id(&self) -> AccountId;

    /// Name used when addressing the account in responses.
    fn display_name(&self) -> &str;

    /// Overwrite the linked Discord identity. Values are stored as given.
    async fn update_identity(&mut self, external_id: &str, external_username: &str) -> Result<()>;

    /// Number of configuration slots currently stored, including writes made through this handle.
    async fn config_count(&mut self) -> Result<usize>;

    /// Insert the slot named `filename`, or replace its content if the name is already taken.
    async fn put_config(&mut self, filename: &str, content: Bytes) -> Result<()>;

    /// Make the handle's writes durable and release the account.
    async fn commit(self: Box<Self>) -> Result<()>;
}
