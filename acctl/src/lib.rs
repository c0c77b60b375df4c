//! # acctl: account identity and configuration uploads
//!
//! `acctl` serves the authenticated user routes of an account service. Clients link a Discord
//! identity to their account and upload named configuration files, which are stored per account
//! subject to two quotas: a per-file size ceiling and a per-account file count ceiling.
//!
//! ## Architecture
//!
//! The HTTP layer is built on [Axum](https://github.com/tokio-rs/axum). Requests flow through
//! three layers:
//!
//! - **API** ([`api`]): decodes JSON and multipart bodies and shapes responses
//! - **Ingestion** ([`ingest`]): applies the quota policy ([`limits`]) file by file and produces
//!   one outcome per uploaded file
//! - **Directory** ([`directory`]): resolves auth tokens to accounts and stores configuration
//!   slots, either in memory or in PostgreSQL ([`db`])
//!
//! Account creation and token issuance belong to the account-management service; this crate only
//! resolves tokens and mutates existing accounts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use acctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = acctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     acctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await
//! }
//! ```
pub mod api;
pub mod config;
pub mod db;
pub mod directory;
pub mod errors;
pub mod ingest;
pub mod limits;
mod openapi;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::config::{DirectoryConfig, PoolSettings};
use crate::directory::{AccountDirectory, MemoryDirectory, PostgresDirectory};
use crate::ingest::ConfigIngestService;
use crate::openapi::ApiDoc;

pub use types::AccountId;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .ingest(ConfigIngestService::new(directory))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub ingest: ConfigIngestService,
}

/// Get the acctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Build the account directory described by the configuration and make the seeded accounts
/// resolvable. Returns the pool as well when the directory is backed by PostgreSQL.
#[instrument(skip_all)]
async fn setup_directory(config: &Config) -> anyhow::Result<(Arc<dyn AccountDirectory>, Option<PgPool>)> {
    match &config.directory {
        DirectoryConfig::Memory => {
            info!("Using in-memory account directory; data will be lost on shutdown");
            Ok((Arc::new(MemoryDirectory::with_seeds(&config.accounts)), None))
        }
        DirectoryConfig::Postgres { url, pool } => {
            info!("Using PostgreSQL account directory");
            let pool = pool_options(pool).connect(url).await?;
            migrator().run(&pool).await?;

            let directory = PostgresDirectory::new(pool.clone());
            directory.seed(&config.accounts).await?;
            Ok((Arc::new(directory), Some(pool)))
        }
    }
}

fn pool_options(settings: &PoolSettings) -> PgPoolOptions {
    let non_zero = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(non_zero(settings.idle_timeout_secs))
        .max_lifetime(non_zero(settings.max_lifetime_secs))
}

/// Build the application router with all routes and middleware.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    // The upload route gets its own body limit; every other route keeps axum's default
    let user_routes = Router::new()
        .route("/updateDiscord", post(api::handlers::users::update_discord))
        .route(
            "/uploadConfigs",
            post(api::handlers::users::upload_configs).layer(DefaultBodyLimit::max(state.config.limits.max_upload_body_size)),
        )
        .with_state(state.clone());

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/user", user_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct.
///
/// 1. **Create**: [`Application::new`] builds the account directory (connecting to and migrating
///    PostgreSQL when configured) and the router
/// 2. **Serve**: [`Application::serve`] binds to the configured address and handles requests
///    until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting acctl with configuration: {:#?}", config);

        let (directory, pool) = setup_directory(&config).await?;
        let state = AppState::builder()
            .config(config.clone())
            .ingest(ConfigIngestService::new(directory))
            .build();
        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("acctl listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
