//! Test utilities for HTTP-level tests against the in-memory directory.

use std::io;
use std::sync::{Arc, Mutex};

use axum_test::TestServer;
use bytes::Bytes;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use uuid::Uuid;

use crate::config::Config;
use crate::directory::{AccountDirectory, MemoryDirectory};
use crate::ingest::ConfigIngestService;
use crate::{AppState, build_router};

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    }
}

pub fn create_test_app() -> (TestServer, Arc<MemoryDirectory>) {
    create_test_app_with_config(create_test_config())
}

pub fn create_test_app_with_config(config: Config) -> (TestServer, Arc<MemoryDirectory>) {
    let directory = Arc::new(MemoryDirectory::new());
    let state = AppState::builder()
        .config(config)
        .ingest(ConfigIngestService::new(directory.clone()))
        .build();

    let router = build_router(&state).expect("Failed to build router");
    let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");
    (server, directory)
}

/// Register an account with a fresh random token and return the token.
pub fn seed_account(directory: &MemoryDirectory, username: &str) -> String {
    let token = Uuid::new_v4().to_string();
    directory.register(&token, username);
    token
}

/// Store `count` small configuration files named `existing-<n>.json` on the account.
pub async fn fill_configs(directory: &MemoryDirectory, token: &str, count: usize) {
    let mut handle = directory
        .resolve(token)
        .await
        .expect("Failed to resolve account")
        .expect("Account not registered");
    for i in 0..count {
        handle
            .put_config(&format!("existing-{i}.json"), Bytes::from_static(b"{}"))
            .await
            .expect("Failed to store config");
    }
    handle.commit().await.expect("Failed to commit");
}

/// In-memory sink for formatted tracing output, for asserting on log levels.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route every event on the current thread into a new capture until the guard is dropped.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();
        (capture.clone(), tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
