//! OpenAPI documentation for the HTTP API.

use utoipa::OpenApi;

use crate::api::{handlers::users, models::users as models};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "acctl",
        description = "Account identity and configuration upload API. Every route authenticates with the `authToken` carried in the request body."
    ),
    paths(users::update_discord, users::upload_configs),
    components(schemas(
        models::UpdateDiscordRequest,
        models::MessageResponse,
        models::ConfigUploadResult,
        models::UploadConfigsResponse,
    )),
    tags(
        (name = "user", description = "Discord identity and configuration uploads"),
    )
)]
pub struct ApiDoc;
