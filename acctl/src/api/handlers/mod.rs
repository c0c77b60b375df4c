//! HTTP request handlers.
//!
//! Handlers decode the transport shape (JSON or multipart), hand decoded values to
//! [`crate::ingest::ConfigIngestService`] and shape its results into responses. Errors are
//! returned as [`crate::errors::Error`], which renders as a JSON `{"message": ...}` body.
//!
//! - [`users`]: Discord identity updates and configuration uploads

pub mod users;
