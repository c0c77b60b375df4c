//! Database record models matching table schemas.
//!
//! - [`accounts`]: Accounts, their linked Discord identity and configuration slots

pub mod accounts;
