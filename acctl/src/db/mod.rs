//! Database layer for the PostgreSQL account directory.
//!
//! ```text
//! ┌───────────────────┐
//! │ PostgresDirectory │  (directory::postgres - account handles)
//! └─────────┬─────────┘
//!           │
//!           ↓
//! ┌───────────────────┐
//! │   Repositories    │  (db::handlers - queries)
//! └─────────┬─────────┘
//!           │
//!           ↓
//! ┌───────────────────┐
//! │      Models       │  (db::models - database records)
//! └─────────┬─────────┘
//!           │
//!           ↓
//! ┌───────────────────┐
//! │    PostgreSQL     │
//! └───────────────────┘
//! ```
//!
//! Migrations live in `migrations/` and are exposed through [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
