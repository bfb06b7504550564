//! Service manager collaborator: systemd unit control and queries.

use super::command::CommandRunner;
use super::{Change, SystemError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Stderr shapes systemctl emits when a unit simply is not there. Acting
/// on a missing unit is an "already satisfied" condition for the teardown
/// verbs, not a failure.
static UNIT_ABSENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(not loaded|could not be found|no such file|does not exist)").unwrap()
});

#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn stop(&self, unit: &str) -> Result<Change, SystemError>;
    async fn disable(&self, unit: &str) -> Result<Change, SystemError>;
    async fn mask(&self, unit: &str) -> Result<Change, SystemError>;
    async fn unmask(&self, unit: &str) -> Result<Change, SystemError>;
    async fn enable(&self, unit: &str) -> Result<Change, SystemError>;
    async fn start(&self, unit: &str) -> Result<Change, SystemError>;

    /// Read-only: is the unit currently active?
    async fn is_active(&self, unit: &str) -> Result<bool, SystemError>;
    /// Read-only: is the unit masked?
    async fn is_masked(&self, unit: &str) -> Result<bool, SystemError>;
    /// Read-only: is the unit enabled at boot?
    async fn is_enabled(&self, unit: &str) -> Result<bool, SystemError>;
}

/// systemctl-backed implementation.
pub struct SystemdManager {
    runner: CommandRunner,
}

impl SystemdManager {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    async fn systemctl(&self, verb: &str, unit: &str) -> Result<Change, SystemError> {
        let out = self.runner.run("systemctl", &[verb, unit]).await?;
        if out.success() {
            return Ok(Change::Applied);
        }
        if UNIT_ABSENT.is_match(&out.stderr) {
            return Ok(Change::AlreadySatisfied);
        }
        Err(SystemError::CommandFailed {
            command: format!("systemctl {verb} {unit}"),
            detail: out.stderr.trim().to_string(),
        })
    }

    /// `systemctl is-enabled` prints one word describing the enablement
    /// state; a spawn failure is a real error, a non-zero exit is not.
    async fn enablement_state(&self, unit: &str) -> Result<String, SystemError> {
        let out = self.runner.run("systemctl", &["is-enabled", unit]).await?;
        Ok(out.stdout_trimmed().to_string())
    }
}

#[async_trait]
impl ServiceManager for SystemdManager {
    async fn stop(&self, unit: &str) -> Result<Change, SystemError> {
        if !self.is_active(unit).await? {
            return Ok(Change::AlreadySatisfied);
        }
        self.systemctl("stop", unit).await
    }

    async fn disable(&self, unit: &str) -> Result<Change, SystemError> {
        if !self.is_enabled(unit).await? {
            return Ok(Change::AlreadySatisfied);
        }
        self.systemctl("disable", unit).await
    }

    async fn mask(&self, unit: &str) -> Result<Change, SystemError> {
        if self.is_masked(unit).await? {
            return Ok(Change::AlreadySatisfied);
        }
        self.systemctl("mask", unit).await
    }

    async fn unmask(&self, unit: &str) -> Result<Change, SystemError> {
        if !self.is_masked(unit).await? {
            return Ok(Change::AlreadySatisfied);
        }
        self.systemctl("unmask", unit).await
    }

    async fn enable(&self, unit: &str) -> Result<Change, SystemError> {
        if self.is_enabled(unit).await? {
            return Ok(Change::AlreadySatisfied);
        }
        self.systemctl("enable", unit).await
    }

    async fn start(&self, unit: &str) -> Result<Change, SystemError> {
        if self.is_active(unit).await? {
            return Ok(Change::AlreadySatisfied);
        }
        self.systemctl("start", unit).await
    }

    async fn is_active(&self, unit: &str) -> Result<bool, SystemError> {
        let out = self.runner.run("systemctl", &["is-active", unit]).await?;
        Ok(out.success())
    }

    async fn is_masked(&self, unit: &str) -> Result<bool, SystemError> {
        Ok(self.enablement_state(unit).await? == "masked")
    }

    async fn is_enabled(&self, unit: &str) -> Result<bool, SystemError> {
        let state = self.enablement_state(unit).await?;
        Ok(state == "enabled" || state == "enabled-runtime")
    }
}
