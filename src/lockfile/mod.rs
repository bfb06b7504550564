//! File-based mutex so two reconciliations cannot interleave steps on the
//! same host. The lock file records the holder's pid; a lock whose holder
//! is no longer alive is taken over rather than refused, so a crashed run
//! does not wedge the host.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum LockError {
    #[error("another reconciliation holds the lock at {path} (pid {pid})")]
    Held { path: String, pid: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Held for the duration of a run; the file is removed on drop.
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                write!(file, "{}", std::process::id())?;
                debug!(path = %path.display(), "run lock acquired");
                Ok(Self {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let pid = std::fs::read_to_string(path)
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                if holder_alive(&pid) {
                    return Err(LockError::Held {
                        path: path.display().to_string(),
                        pid,
                    });
                }
                warn!(path = %path.display(), stale_pid = %pid, "taking over stale run lock");
                std::fs::write(path, std::process::id().to_string())?;
                Ok(Self {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn holder_alive(pid: &str) -> bool {
    match pid.parse::<u32>() {
        Ok(pid) => Path::new(&format!("/proc/{pid}")).exists(),
        Err(_) => false,
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
