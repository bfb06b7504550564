//! Snap client collaborator: queries and teardown through the `snap` CLI.

use super::command::CommandRunner;
use super::{Change, SystemError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// `snap remove` on a package that is not there.
static SNAP_ABSENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(is not installed|not found)"#).unwrap());

#[async_trait]
pub trait SnapClient: Send + Sync {
    /// Is the `snap` command present and responding?
    async fn available(&self) -> bool;

    /// Names of currently installed snap packages. Empty when the snap
    /// command itself is gone.
    async fn installed_snaps(&self) -> Result<Vec<String>, SystemError>;

    async fn remove(&self, name: &str) -> Result<Change, SystemError>;
}

pub struct HostSnapClient {
    runner: CommandRunner,
}

impl HostSnapClient {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl SnapClient for HostSnapClient {
    async fn available(&self) -> bool {
        matches!(self.runner.run("snap", &["version"]).await, Ok(out) if out.success())
    }

    async fn installed_snaps(&self) -> Result<Vec<String>, SystemError> {
        if !self.available().await {
            return Ok(Vec::new());
        }
        let out = self.runner.run("snap", &["list"]).await?;
        if !out.success() {
            // "No snaps are installed yet" goes to stderr with exit 0 on
            // current snapd, but older releases exit non-zero.
            return Ok(Vec::new());
        }
        let names = out
            .stdout
            .lines()
            .skip(1) // header row
            .filter_map(|line| line.split_whitespace().next())
            .map(|name| name.to_string())
            .collect();
        Ok(names)
    }

    async fn remove(&self, name: &str) -> Result<Change, SystemError> {
        let out = self.runner.run("snap", &["remove", "--purge", name]).await?;
        if out.success() {
            return Ok(Change::Applied);
        }
        if SNAP_ABSENT.is_match(&out.stderr) {
            return Ok(Change::AlreadySatisfied);
        }
        Err(SystemError::CommandFailed {
            command: format!("snap remove {name}"),
            detail: out.stderr.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_absent_patterns() {
        assert!(SNAP_ABSENT.is_match(r#"snap "firefox" is not installed"#));
        assert!(SNAP_ABSENT.is_match(r#"error: snap "hello" not found"#));
        assert!(!SNAP_ABSENT.is_match("error: cannot perform the following tasks"));
    }
}
