//! Filesystem collaborator: directory teardown, blocker directories and
//! backup/restore of the managed config directory.

use super::{Change, SystemError};
use crate::backup;
use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Mode for blocker directories: nothing can create entries inside them.
const BLOCKED_MODE: u32 = 0o000;

#[async_trait]
pub trait FsManager: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    /// Recursively delete a directory.
    async fn remove_dir(&self, path: &Path) -> Result<Change, SystemError>;

    /// Recreate `path` as an empty, unwritable directory so nothing
    /// silently repopulates it.
    async fn block_dir(&self, path: &Path) -> Result<Change, SystemError>;

    /// Make a blocked directory usable again.
    async fn unblock_dir(&self, path: &Path) -> Result<Change, SystemError>;

    /// Read-only: is `path` an existing blocker directory?
    async fn is_blocked(&self, path: &Path) -> Result<bool, SystemError>;

    /// Take a timestamped backup of `src` before destructive steps.
    async fn backup(&self, src: &Path) -> Result<Change, SystemError>;

    /// Restore `src` from its newest backup, if one exists.
    async fn restore_latest(&self, src: &Path) -> Result<Change, SystemError>;

    /// Read-only: does any backup exist for `src`?
    async fn has_backup(&self, src: &Path) -> bool;
}

/// Real-filesystem implementation.
pub struct HostFs;

#[async_trait]
impl FsManager for HostFs {
    async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).await.is_ok()
    }

    async fn remove_dir(&self, path: &Path) -> Result<Change, SystemError> {
        if !self.exists(path).await {
            return Ok(Change::AlreadySatisfied);
        }
        fs::remove_dir_all(path).await?;
        Ok(Change::Applied)
    }

    async fn block_dir(&self, path: &Path) -> Result<Change, SystemError> {
        if self.is_blocked(path).await? {
            return Ok(Change::AlreadySatisfied);
        }
        fs::create_dir_all(path).await?;
        fs::set_permissions(path, std::fs::Permissions::from_mode(BLOCKED_MODE)).await?;
        Ok(Change::Applied)
    }

    async fn unblock_dir(&self, path: &Path) -> Result<Change, SystemError> {
        if !self.exists(path).await {
            return Ok(Change::AlreadySatisfied);
        }
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
        Ok(Change::Applied)
    }

    async fn is_blocked(&self, path: &Path) -> Result<bool, SystemError> {
        let meta = match fs::metadata(path).await {
            Ok(meta) => meta,
            Err(_) => return Ok(false),
        };
        Ok(meta.is_dir() && meta.permissions().mode() & 0o777 == BLOCKED_MODE)
    }

    async fn backup(&self, src: &Path) -> Result<Change, SystemError> {
        match backup::create_backup(src).await? {
            Some(dest) => {
                info!(source = %src.display(), backup = %dest.display(), "config backed up");
                Ok(Change::Applied)
            }
            None => Ok(Change::AlreadySatisfied),
        }
    }

    async fn restore_latest(&self, src: &Path) -> Result<Change, SystemError> {
        match backup::find_latest_backup(src).await? {
            Some(found) => {
                let restored = backup::restore_backup(&found, src).await?;
                info!(
                    backup = %found.display(),
                    files = restored,
                    "config restored from backup"
                );
                Ok(Change::Applied)
            }
            None => Ok(Change::AlreadySatisfied),
        }
    }

    async fn has_backup(&self, src: &Path) -> bool {
        matches!(backup::find_latest_backup(src).await, Ok(Some(_)))
    }
}
