//! Timestamped configuration backups.
//!
//! Before a plan's first destructive step, the managed config directory is
//! copied to a sibling `<dir>.bak.<timestamp>` directory together with a
//! JSON manifest carrying a SHA-256 hash per file. Rollback and the
//! enable plan's `restore-config` step read the newest backup back.

use crate::utils::{hash_bytes, now_compact, now_iso};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::warn;
use walkdir::WalkDir;

/// Manifest file written at the root of every backup directory.
pub const BACKUP_MANIFEST_FILE: &str = ".snapgate-backup.json";

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("no backup manifest found at {0}")]
    MissingManifest(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub path: String,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    pub schema_version: u32,
    pub source: String,
    pub created_at: String,
    pub files: Vec<BackupEntry>,
}

/// Sibling backup path for `src` at the given timestamp.
pub fn backup_path_for(src: &Path, timestamp: &str) -> PathBuf {
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup".to_string());
    src.with_file_name(format!("{name}.bak.{timestamp}"))
}

/// Copy `src` into a fresh timestamped sibling directory and write the
/// hash manifest. Returns `None` when `src` does not exist - nothing to
/// protect is not an error.
pub async fn create_backup(src: &Path) -> Result<Option<PathBuf>, BackupError> {
    if fs::metadata(src).await.is_err() {
        return Ok(None);
    }

    let dest = backup_path_for(src, &now_compact());
    fs::create_dir_all(&dest).await?;

    let mut files = Vec::new();
    for entry in WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).await?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            let bytes = fs::read(entry.path()).await?;
            fs::write(&target, &bytes).await?;
            files.push(BackupEntry {
                path: relative.to_string_lossy().into_owned(),
                hash: hash_bytes(&bytes),
            });
        }
        // Symlinks are skipped: snapd recreates its own.
    }

    let manifest = BackupManifest {
        schema_version: 1,
        source: src.to_string_lossy().into_owned(),
        created_at: now_iso(),
        files,
    };
    fs::write(
        dest.join(BACKUP_MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest)?,
    )
    .await?;

    Ok(Some(dest))
}

/// Newest backup for `src`, by the sortable timestamp embedded in the
/// directory name.
pub async fn find_latest_backup(src: &Path) -> Result<Option<PathBuf>, BackupError> {
    let (Some(parent), Some(name)) = (src.parent(), src.file_name()) else {
        return Ok(None);
    };
    let prefix = format!("{}.bak.", name.to_string_lossy());

    let mut read_dir = match fs::read_dir(parent).await {
        Ok(read_dir) => read_dir,
        Err(_) => return Ok(None),
    };

    let mut newest: Option<(String, PathBuf)> = None;
    while let Some(entry) = read_dir.next_entry().await? {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !file_name.starts_with(&prefix) || !entry.path().is_dir() {
            continue;
        }
        if newest.as_ref().map(|(best, _)| file_name > *best).unwrap_or(true) {
            newest = Some((file_name, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Restore every file recorded in a backup's manifest into `dest`.
/// Hash mismatches are logged, not raised: at restore time the backup is
/// the best information available. Returns the number of files restored.
pub async fn restore_backup(backup: &Path, dest: &Path) -> Result<usize, BackupError> {
    let manifest_path = backup.join(BACKUP_MANIFEST_FILE);
    let raw = fs::read_to_string(&manifest_path)
        .await
        .map_err(|_| BackupError::MissingManifest(manifest_path.display().to_string()))?;
    let manifest: BackupManifest = serde_json::from_str(&raw)?;

    fs::create_dir_all(dest).await?;

    let mut restored = 0;
    for entry in &manifest.files {
        let from = backup.join(&entry.path);
        let to = dest.join(&entry.path);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await?;
        }
        let bytes = fs::read(&from).await?;
        if hash_bytes(&bytes) != entry.hash {
            warn!(file = %entry.path, "backup content does not match its manifest hash");
        }
        fs::write(&to, &bytes).await?;
        restored += 1;
    }
    Ok(restored)
}
