//! Configuration upload quotas.
//!
//! Two fixed ceilings apply to every account: a per-file size limit and a limit on the number of
//! stored configuration slots. The checks are pure so the policy can be exercised without a
//! directory or any HTTP machinery; [`crate::ingest`] applies them in order for each file.

use crate::ingest::FileStatus;

/// Largest configuration accepted, in bytes. Files of exactly this size are accepted.
pub const MAX_CONFIG_SIZE: u64 = 200_000;

/// Maximum number of configuration slots an account may hold.
pub const MAX_CONFIGS_PER_ACCOUNT: usize = 80;

/// Per-file size check. Runs before the count check, so an oversized file never consumes quota.
pub fn check_size(size_bytes: u64) -> Option<FileStatus> {
    (size_bytes > MAX_CONFIG_SIZE).then_some(FileStatus::TooLarge)
}

/// Per-account count check against the number of slots stored right now.
///
/// Overwriting an existing slot does not grow the count, but the check still rejects it once the
/// account is full.
pub fn check_count(current_configs: usize) -> Option<FileStatus> {
    (current_configs >= MAX_CONFIGS_PER_ACCOUNT).then_some(FileStatus::QuotaExceeded)
}
