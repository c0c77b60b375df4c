//! Account identity updates and configuration ingestion.
//!
//! [`ConfigIngestService`] is the core behind both user routes. It works on already-decoded
//! input (a token plus an ordered list of [`UploadEntry`] values), so none of the quota logic
//! depends on multipart parsing.
//!
//! Each file in a batch is judged on its own, strictly in input order:
//!
//! 1. larger than [`MAX_CONFIG_SIZE`](crate::limits::MAX_CONFIG_SIZE) → [`FileStatus::TooLarge`]
//! 2. account already holds [`MAX_CONFIGS_PER_ACCOUNT`](crate::limits::MAX_CONFIGS_PER_ACCOUNT)
//!    slots → [`FileStatus::QuotaExceeded`]
//! 3. otherwise stored → [`FileStatus::Stored`]
//!
//! The slot count is re-read for every file, so files accepted earlier in a batch count against
//! later ones. Rejections are reported per file; only request-level problems (bad shape, unknown
//! token, storage failure) fail the whole call.

use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, info, instrument};

use crate::directory::AccountDirectory;
use crate::errors::{Error, Result};
use crate::limits;
use crate::types::abbrev_uuid;

pub const MISSING_IDENTITY_PARAMS: &str = "Expecting parameters 'authToken', 'id' and 'username'.";
pub const MALFORMED_UPLOAD: &str = "Expecting MultiPart Form, containing 'authToken' and 'config'.";

/// One decoded file from an upload request.
#[derive(Debug, Clone)]
pub struct UploadEntry {
    pub filename: String,
    pub size_bytes: u64,
    pub content: Bytes,
}

impl UploadEntry {
    /// Entry whose size is the length of `content`.
    pub fn new(filename: impl Into<String>, content: Bytes) -> Self {
        Self {
            filename: filename.into(),
            size_bytes: content.len() as u64,
            content,
        }
    }
}

/// Final state of a single uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Stored,
    TooLarge,
    QuotaExceeded,
}

impl FileStatus {
    pub fn message(self) -> &'static str {
        match self {
            FileStatus::Stored => "Configuration stored successfully.",
            FileStatus::TooLarge => "The provided configuration is bigger than 200 kilobytes.",
            FileStatus::QuotaExceeded => "User exceeded the configuration amount limit.",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Stored => "stored",
            FileStatus::TooLarge => "too_large",
            FileStatus::QuotaExceeded => "quota_exceeded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub filename: String,
    pub status: FileStatus,
    pub message: &'static str,
}

impl FileOutcome {
    fn new(filename: String, status: FileStatus) -> Self {
        Self {
            filename,
            status,
            message: status.message(),
        }
    }
}

#[derive(Clone)]
pub struct ConfigIngestService {
    directory: Arc<dyn AccountDirectory>,
}

impl ConfigIngestService {
    pub fn new(directory: Arc<dyn AccountDirectory>) -> Self {
        Self { directory }
    }

    /// Replace the account's linked Discord identity and return the confirmation message.
    #[instrument(skip_all)]
    pub async fn update_identity(&self, token: &str, external_id: &str, external_username: &str) -> Result<String> {
        if token.is_empty() || external_id.is_empty() || external_username.is_empty() {
            return Err(Error::BadRequest {
                message: MISSING_IDENTITY_PARAMS.to_string(),
            });
        }

        let mut account = self.directory.resolve(token).await?.ok_or(Error::InvalidToken)?;
        account.update_identity(external_id, external_username).await?;

        let account_id = account.id();
        let message = format!("Successfully updated {} Discord Information.", account.display_name());
        account.commit().await?;

        counter!("acctl_identity_updates_total").increment(1);
        info!(account_id = %abbrev_uuid(&account_id), "Updated Discord information");
        Ok(message)
    }

    /// Apply the upload quotas to `files` in order and store the accepted ones.
    ///
    /// Returns exactly one outcome per input file, in input order.
    #[instrument(skip_all, fields(files = files.len()))]
    pub async fn ingest(&self, token: &str, files: Vec<UploadEntry>) -> Result<Vec<FileOutcome>> {
        if files.is_empty() {
            return Err(Error::BadRequest {
                message: MALFORMED_UPLOAD.to_string(),
            });
        }

        let mut account = self.directory.resolve(token).await?.ok_or(Error::InvalidToken)?;
        let account_id = account.id();

        let mut outcomes = Vec::with_capacity(files.len());
        for UploadEntry {
            filename,
            size_bytes,
            content,
        } in files
        {
            let status = match limits::check_size(size_bytes) {
                Some(rejected) => rejected,
                None => match limits::check_count(account.config_count().await?) {
                    Some(rejected) => rejected,
                    None => {
                        account.put_config(&filename, content).await?;
                        FileStatus::Stored
                    }
                },
            };

            debug!(
                account_id = %abbrev_uuid(&account_id),
                filename = %filename,
                size_bytes,
                status = status.as_str(),
                "Processed configuration file"
            );
            counter!("acctl_config_uploads_total", "status" => status.as_str()).increment(1);
            outcomes.push(FileOutcome::new(filename, status));
        }

        account.commit().await?;

        let stored = outcomes.iter().filter(|o| o.status == FileStatus::Stored).count();
        info!(
            account_id = %abbrev_uuid(&account_id),
            received = outcomes.len(),
            stored,
            "Configuration upload complete"
        );
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use crate::limits::{MAX_CONFIG_SIZE, MAX_CONFIGS_PER_ACCOUNT};
    use crate::test_utils::LogCapture;

    const TOKEN: &str = "token-steve";

    fn setup() -> (Arc<MemoryDirectory>, ConfigIngestService) {
        let directory = Arc::new(MemoryDirectory::new());
        directory.register(TOKEN, "Steve");
        let service = ConfigIngestService::new(directory.clone());
        (directory, service)
    }

    fn file(name: &str, len: usize) -> UploadEntry {
        UploadEntry::new(name, Bytes::from(vec![b'x'; len]))
    }

    async fn prefill(directory: &MemoryDirectory, count: usize) {
        let mut handle = directory.resolve(TOKEN).await.unwrap().unwrap();
        for i in 0..count {
            handle
                .put_config(&format!("existing-{i}.json"), Bytes::from_static(b"{}"))
                .await
                .unwrap();
        }
        handle.commit().await.unwrap();
    }

    async fn config_count(directory: &MemoryDirectory) -> usize {
        directory.snapshot(TOKEN).await.unwrap().configs.len()
    }

    fn statuses(outcomes: &[FileOutcome]) -> Vec<FileStatus> {
        outcomes.iter().map(|o| o.status).collect()
    }

    #[test_log::test(tokio::test)]
    async fn test_outcomes_follow_input_order() {
        let (_directory, service) = setup();
        let files = vec![
            file("a.json", 10),
            file("huge.json", MAX_CONFIG_SIZE as usize + 1),
            file("b.json", 10),
        ];

        let outcomes = service.ingest(TOKEN, files).await.unwrap();

        let names: Vec<_> = outcomes.iter().map(|o| o.filename.as_str()).collect();
        assert_eq!(names, ["a.json", "huge.json", "b.json"]);
        assert_eq!(
            statuses(&outcomes),
            [FileStatus::Stored, FileStatus::TooLarge, FileStatus::Stored]
        );
        assert_eq!(outcomes[1].message, "The provided configuration is bigger than 200 kilobytes.");
        assert_eq!(outcomes[0].message, "Configuration stored successfully.");
    }

    #[tokio::test]
    async fn test_too_large_file_is_not_stored() {
        let (directory, service) = setup();
        prefill(&directory, 3).await;

        let outcomes = service
            .ingest(TOKEN, vec![file("huge.json", MAX_CONFIG_SIZE as usize + 1)])
            .await
            .unwrap();

        assert_eq!(statuses(&outcomes), [FileStatus::TooLarge]);
        let record = directory.snapshot(TOKEN).await.unwrap();
        assert_eq!(record.configs.len(), 3);
        assert!(!record.configs.contains_key("huge.json"));
    }

    #[tokio::test]
    async fn test_declared_size_decides_too_large() {
        let (directory, service) = setup();
        let entry = UploadEntry {
            filename: "declared.json".to_string(),
            size_bytes: MAX_CONFIG_SIZE + 1,
            content: Bytes::from_static(b"{}"),
        };

        let outcomes = service.ingest(TOKEN, vec![entry]).await.unwrap();

        assert_eq!(statuses(&outcomes), [FileStatus::TooLarge]);
        assert_eq!(config_count(&directory).await, 0);
    }

    #[tokio::test]
    async fn test_file_at_size_limit_is_accepted() {
        let (directory, service) = setup();

        let outcomes = service
            .ingest(TOKEN, vec![file("exact.json", MAX_CONFIG_SIZE as usize)])
            .await
            .unwrap();

        assert_eq!(statuses(&outcomes), [FileStatus::Stored]);
        assert_eq!(config_count(&directory).await, 1);
    }

    #[tokio::test]
    async fn test_full_account_rejects_every_file() {
        let (directory, service) = setup();
        prefill(&directory, MAX_CONFIGS_PER_ACCOUNT).await;

        let outcomes = service
            .ingest(TOKEN, vec![file("a.json", 10), file("b.json", 10)])
            .await
            .unwrap();

        assert_eq!(statuses(&outcomes), [FileStatus::QuotaExceeded, FileStatus::QuotaExceeded]);
        assert_eq!(outcomes[0].message, "User exceeded the configuration amount limit.");
        assert_eq!(config_count(&directory).await, MAX_CONFIGS_PER_ACCOUNT);
    }

    #[tokio::test]
    async fn test_full_account_rejects_overwrite_too() {
        let (directory, service) = setup();
        prefill(&directory, MAX_CONFIGS_PER_ACCOUNT).await;

        let outcomes = service.ingest(TOKEN, vec![file("existing-0.json", 10)]).await.unwrap();

        assert_eq!(statuses(&outcomes), [FileStatus::QuotaExceeded]);
        let record = directory.snapshot(TOKEN).await.unwrap();
        assert_eq!(record.configs.get("existing-0.json").unwrap().as_ref(), b"{}");
    }

    #[tokio::test]
    async fn test_quota_is_cumulative_within_batch() {
        let (directory, service) = setup();
        prefill(&directory, MAX_CONFIGS_PER_ACCOUNT - 1).await;

        let outcomes = service
            .ingest(TOKEN, vec![file("a.json", 10), file("b.json", 10)])
            .await
            .unwrap();

        assert_eq!(statuses(&outcomes), [FileStatus::Stored, FileStatus::QuotaExceeded]);
        assert_eq!(config_count(&directory).await, MAX_CONFIGS_PER_ACCOUNT);
    }

    #[tokio::test]
    async fn test_too_large_file_does_not_consume_quota() {
        let (directory, service) = setup();
        prefill(&directory, MAX_CONFIGS_PER_ACCOUNT - 1).await;

        let outcomes = service
            .ingest(
                TOKEN,
                vec![
                    file("huge.json", MAX_CONFIG_SIZE as usize + 1),
                    file("a.json", 10),
                    file("b.json", 10),
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            statuses(&outcomes),
            [FileStatus::TooLarge, FileStatus::Stored, FileStatus::QuotaExceeded]
        );
    }

    #[tokio::test]
    async fn test_same_filename_overwrites() {
        let (directory, service) = setup();

        let outcomes = service
            .ingest(
                TOKEN,
                vec![
                    UploadEntry::new("hud.json", Bytes::from_static(b"first")),
                    UploadEntry::new("hud.json", Bytes::from_static(b"second")),
                ],
            )
            .await
            .unwrap();

        assert_eq!(statuses(&outcomes), [FileStatus::Stored, FileStatus::Stored]);
        let record = directory.snapshot(TOKEN).await.unwrap();
        assert_eq!(record.configs.len(), 1);
        assert_eq!(record.configs.get("hud.json").unwrap().as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_ingest_with_unknown_token() {
        let (directory, service) = setup();

        let err = service.ingest("nope", vec![file("a.json", 10)]).await.unwrap_err();

        assert!(matches!(err, Error::InvalidToken));
        assert_eq!(config_count(&directory).await, 0);
    }

    #[tokio::test]
    async fn test_ingest_without_files() {
        let (_directory, service) = setup();

        let err = service.ingest(TOKEN, vec![]).await.unwrap_err();

        match err {
            Error::BadRequest { message } => assert_eq!(message, MALFORMED_UPLOAD),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_uploads_never_exceed_quota() {
        let (directory, service) = setup();

        let uploads = (0..4).map(|batch| {
            let service = service.clone();
            tokio::spawn(async move {
                let files = (0..30).map(|i| file(&format!("batch{batch}-{i}.json"), 10)).collect();
                service.ingest(TOKEN, files).await.unwrap()
            })
        });
        let results = futures::future::join_all(uploads).await;

        let stored: usize = results
            .into_iter()
            .map(|r| r.unwrap().iter().filter(|o| o.status == FileStatus::Stored).count())
            .sum();
        assert_eq!(stored, MAX_CONFIGS_PER_ACCOUNT);
        assert_eq!(config_count(&directory).await, MAX_CONFIGS_PER_ACCOUNT);
    }

    #[tokio::test]
    async fn test_update_identity_last_write_wins() {
        let (directory, service) = setup();

        service.update_identity(TOKEN, "111", "first#0001").await.unwrap();
        let message = service.update_identity(TOKEN, "222", "second#0002").await.unwrap();

        assert_eq!(message, "Successfully updated Steve Discord Information.");
        let record = directory.snapshot(TOKEN).await.unwrap();
        assert_eq!(record.discord_id.as_deref(), Some("222"));
        assert_eq!(record.discord_username.as_deref(), Some("second#0002"));
    }

    #[tokio::test]
    async fn test_update_identity_with_unknown_token() {
        let (_directory, service) = setup();

        let err = service.update_identity("nope", "111", "steve#0001").await.unwrap_err();

        assert!(matches!(err, Error::InvalidToken));
        assert_eq!(err.user_message(), "The provided Authorization Token is invalid.");
    }

    #[tokio::test]
    async fn test_update_identity_requires_all_fields() {
        let (directory, service) = setup();

        for (token, id, username) in [("", "1", "a"), (TOKEN, "", "a"), (TOKEN, "1", ""), ("unknown", "", "a")] {
            let err = service.update_identity(token, id, username).await.unwrap_err();
            match err {
                Error::BadRequest { message } => assert_eq!(message, MISSING_IDENTITY_PARAMS),
                other => panic!("unexpected error: {other:?}"),
            }
        }
        assert!(directory.snapshot(TOKEN).await.unwrap().discord_id.is_none());
    }

    #[tokio::test]
    async fn test_client_rejections_are_not_logged_as_errors() {
        let (_directory, service) = setup();
        let (logs, _guard) = LogCapture::install();

        let err = service.ingest("bogus", vec![file("a.json", 10)]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidToken));
        let err = service.update_identity("bogus", "1", "steve").await.unwrap_err();
        assert!(matches!(err, Error::InvalidToken));
        let err = service.update_identity(TOKEN, "", "steve").await.unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));

        service.ingest(TOKEN, vec![file("a.json", 10)]).await.unwrap();

        let output = logs.contents();
        assert!(output.contains("Configuration upload complete"), "capture saw nothing: {output}");
        assert!(!output.contains("ERROR"), "client rejection logged at error level: {output}");
    }
}
