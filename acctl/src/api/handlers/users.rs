//! HTTP handlers for the user routes: Discord identity updates and configuration uploads.

use axum::{
    Json,
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use serde_json::Value;
use tracing::debug;

use crate::{
    AppState,
    api::models::users::{MessageResponse, UpdateDiscordRequest, UploadConfigsResponse},
    errors::{Error, Result},
    ingest::{MALFORMED_UPLOAD, MISSING_IDENTITY_PARAMS, UploadEntry},
};

/// Update the Discord information linked to an account
#[utoipa::path(
    post,
    path = "/user/updateDiscord",
    tag = "user",
    request_body = UpdateDiscordRequest,
    responses(
        (status = 200, description = "Discord information updated", body = MessageResponse),
        (status = 400, description = "Missing parameters or invalid authorization token", body = MessageResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_discord(State(state): State<AppState>, body: Bytes) -> Result<Json<MessageResponse>> {
    let request = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|value| UpdateDiscordRequest::from_json(&value))
        .ok_or_else(|| Error::BadRequest {
            message: MISSING_IDENTITY_PARAMS.to_string(),
        })?;

    let message = state
        .ingest
        .update_identity(&request.auth_token, &request.id, &request.username)
        .await?;

    Ok(Json(MessageResponse { message }))
}

/// Upload one or more configuration files
///
/// Each file is accepted or rejected on its own; the response lists one result per file in the
/// order the files were sent.
#[utoipa::path(
    post,
    path = "/user/uploadConfigs",
    tag = "user",
    request_body(
        content_type = "multipart/form-data",
        description = "Form with an `authToken` field and one or more files under `config`"
    ),
    responses(
        (status = 200, description = "Per-file upload results", body = UploadConfigsResponse),
        (status = 400, description = "Malformed form or invalid authorization token", body = MessageResponse),
        (status = 413, description = "Request body too large", body = MessageResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_configs(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadConfigsResponse>> {
    let mut multipart = multipart.map_err(|e| {
        debug!(error = %e, "Upload is not a multipart form");
        malformed_upload()
    })?;

    let mut auth_token: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "authToken" => {
                let value = field.text().await.map_err(multipart_error)?;
                if auth_token.is_none() {
                    auth_token = Some(value);
                }
            }
            "config" => {
                let Some(filename) = field.file_name().map(str::to_string) else {
                    debug!("Skipping 'config' field without a filename");
                    continue;
                };
                let content = field.bytes().await.map_err(multipart_error)?;
                files.push(UploadEntry::new(filename, content));
            }
            _ => {}
        }
    }

    let Some(auth_token) = auth_token else {
        return Err(malformed_upload());
    };
    if files.is_empty() {
        return Err(malformed_upload());
    }

    let outcomes = state.ingest.ingest(&auth_token, files).await?;

    Ok(Json(UploadConfigsResponse {
        results: outcomes.into_iter().map(Into::into).collect(),
    }))
}

fn malformed_upload() -> Error {
    Error::BadRequest {
        message: MALFORMED_UPLOAD.to_string(),
    }
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Error::PayloadTooLarge {
            message: "The upload exceeds the maximum request size.".to_string(),
        };
    }
    debug!(error = %e, "Failed to parse multipart data");
    malformed_upload()
}
