//! API request/response models for the user routes.

use crate::ingest::FileOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Body of `POST /user/updateDiscord`.
///
/// The handler reads the body leniently (see [`UpdateDiscordRequest::from_json`]); this type also
/// documents the expected shape in the OpenAPI document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateDiscordRequest {
    #[serde(rename = "authToken")]
    pub auth_token: String,
    /// Discord user id
    pub id: String,
    /// Discord username
    pub username: String,
}

impl UpdateDiscordRequest {
    /// Extract the three fields from an arbitrary JSON value. Numbers are accepted for string
    /// fields (Discord ids are often sent as numbers). Returns `None` if any field is missing,
    /// empty or of another type.
    pub fn from_json(body: &Value) -> Option<Self> {
        Some(Self {
            auth_token: string_field(body, "authToken")?,
            id: string_field(body, "id")?,
            username: string_field(body, "username")?,
        })
    }
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    let value = match body.get(key)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

/// Plain message response used by every non-batch reply.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Result for one uploaded file, in upload order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfigUploadResult {
    /// Filename as uploaded
    pub name: String,
    pub message: String,
}

impl From<FileOutcome> for ConfigUploadResult {
    fn from(outcome: FileOutcome) -> Self {
        Self {
            name: outcome.filename,
            message: outcome.message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadConfigsResponse {
    pub results: Vec<ConfigUploadResult>,
}
