//! Promotion of a staged `<binary>.update` file onto the live binary.
//!
//! A running server keeps its executable locked on some platforms, so the
//! rename is retried for a while before giving up.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// How hard to try before the final, fallible rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacePolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ReplacePolicy {
    fn default() -> Self {
        Self {
            attempts: 8,
            delay: Duration::from_millis(250),
        }
    }
}

/// The staged file could not be moved onto the target.
#[derive(Debug, Error)]
#[error(
    "Failed to replace {} with {}: {source}",
    target.display(),
    staged.display()
)]
pub struct ReplaceError {
    pub target: PathBuf,
    pub staged: PathBuf,
    #[source]
    pub source: io::Error,
}

/// `<path>.update`
#[must_use]
pub fn staged_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".update");
    PathBuf::from(name)
}

/// Move `staged` onto `target` if it exists.
///
/// Returns whether a file was promoted. Failed renames are retried
/// `policy.attempts` times; the attempt after that reports its error.
pub async fn promote_staged_update(
    target: &Path,
    staged: &Path,
    policy: ReplacePolicy,
) -> Result<bool, ReplaceError> {
    for attempt in 1..=policy.attempts {
        if !staged.exists() {
            return Ok(false);
        }
        match std::fs::rename(staged, target) {
            Ok(()) => {
                tracing::info!(target = %target.display(), "Promoted staged server update");
                return Ok(true);
            }
            Err(e) => {
                tracing::debug!(attempt, "Staged update rename failed: {e}");
            }
        }
        tokio::time::sleep(policy.delay).await;
    }

    if !staged.exists() {
        return Ok(false);
    }
    std::fs::rename(staged, target).map_err(|source| ReplaceError {
        target: target.to_path_buf(),
        staged: staged.to_path_buf(),
        source,
    })?;
    tracing::info!(target = %target.display(), "Promoted staged server update");
    Ok(true)
}
