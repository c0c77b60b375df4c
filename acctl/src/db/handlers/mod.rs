//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection or transaction and returns models from
//! [`crate::db::models`]. Create repositories from a transaction when the caller needs several
//! statements to apply atomically:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut accounts = Accounts::new(&mut tx);
//! let account = accounts.get_by_token_for_update("token").await?;
//! tx.commit().await?;
//! ```

pub mod accounts;

pub use accounts::Accounts;
