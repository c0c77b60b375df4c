use crate::db::errors::DbError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

pub const INVALID_TOKEN: &str = "The provided Authorization Token is invalid.";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Malformed or incomplete request shape
    #[error("{message}")]
    BadRequest { message: String },

    /// Authorization token does not resolve to an account. Unknown and revoked tokens are not
    /// distinguished.
    #[error("Invalid authorization token")]
    InvalidToken,

    /// Request body exceeded the transport limit
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// Directory / database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } | Error::InvalidToken => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Database(_) | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } | Error::PayloadTooLarge { message } => message.clone(),
            Error::InvalidToken => INVALID_TOKEN.to_string(),
            Error::Database(_) => "Database error occurred".to_string(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Database(_) | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::InvalidToken | Error::BadRequest { .. } | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), Json(json!({ "message": self.user_message() }))).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
