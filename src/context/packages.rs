//! Package manager collaborator: install, purge, hold and queries on the
//! host package database (apt or dnf, picked by OS detection).

use super::command::CommandRunner;
use super::{Change, SystemError};
use crate::os::PackageBackend;
use async_trait::async_trait;

#[async_trait]
pub trait PackageManager: Send + Sync {
    async fn install(&self, package: &str) -> Result<Change, SystemError>;
    async fn purge(&self, package: &str) -> Result<Change, SystemError>;
    /// Pin the package so routine upgrades do not reinstall it.
    async fn hold(&self, package: &str) -> Result<Change, SystemError>;
    async fn unhold(&self, package: &str) -> Result<Change, SystemError>;

    async fn is_installed(&self, package: &str) -> Result<bool, SystemError>;
    async fn is_held(&self, package: &str) -> Result<bool, SystemError>;
}

pub struct HostPackageManager {
    backend: PackageBackend,
    runner: CommandRunner,
}

impl HostPackageManager {
    pub fn new(backend: PackageBackend, runner: CommandRunner) -> Self {
        Self { backend, runner }
    }

    async fn expect_success(
        &self,
        program: &str,
        args: &[&str],
    ) -> Result<Change, SystemError> {
        let out = self.runner.run(program, args).await?;
        if out.success() {
            Ok(Change::Applied)
        } else {
            Err(SystemError::CommandFailed {
                command: format!("{program} {}", args.join(" ")),
                detail: out.stderr.trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl PackageManager for HostPackageManager {
    async fn install(&self, package: &str) -> Result<Change, SystemError> {
        if self.is_installed(package).await? {
            return Ok(Change::AlreadySatisfied);
        }
        match self.backend {
            PackageBackend::Apt => {
                self.expect_success("apt-get", &["install", "-y", package])
                    .await
            }
            PackageBackend::Dnf => {
                self.expect_success("dnf", &["install", "-y", package]).await
            }
        }
    }

    async fn purge(&self, package: &str) -> Result<Change, SystemError> {
        if !self.is_installed(package).await? {
            return Ok(Change::AlreadySatisfied);
        }
        match self.backend {
            PackageBackend::Apt => {
                self.expect_success("apt-get", &["purge", "-y", package]).await
            }
            PackageBackend::Dnf => {
                self.expect_success("dnf", &["remove", "-y", package]).await
            }
        }
    }

    async fn hold(&self, package: &str) -> Result<Change, SystemError> {
        if self.is_held(package).await? {
            return Ok(Change::AlreadySatisfied);
        }
        match self.backend {
            PackageBackend::Apt => self.expect_success("apt-mark", &["hold", package]).await,
            PackageBackend::Dnf => {
                // Requires the versionlock plugin; the hold steps are
                // best-effort in every plan, so a missing plugin surfaces
                // as a degraded run rather than an abort.
                self.expect_success("dnf", &["versionlock", "add", package])
                    .await
            }
        }
    }

    async fn unhold(&self, package: &str) -> Result<Change, SystemError> {
        if !self.is_held(package).await? {
            return Ok(Change::AlreadySatisfied);
        }
        match self.backend {
            PackageBackend::Apt => self.expect_success("apt-mark", &["unhold", package]).await,
            PackageBackend::Dnf => {
                self.expect_success("dnf", &["versionlock", "delete", package])
                    .await
            }
        }
    }

    async fn is_installed(&self, package: &str) -> Result<bool, SystemError> {
        match self.backend {
            PackageBackend::Apt => {
                let out = self
                    .runner
                    .run("dpkg-query", &["-W", "-f=${Status}", package])
                    .await?;
                Ok(out.success() && out.stdout.contains("install ok installed"))
            }
            PackageBackend::Dnf => {
                let out = self.runner.run("rpm", &["-q", package]).await?;
                Ok(out.success())
            }
        }
    }

    async fn is_held(&self, package: &str) -> Result<bool, SystemError> {
        match self.backend {
            PackageBackend::Apt => {
                let out = self.runner.run("apt-mark", &["showhold", package]).await?;
                Ok(out
                    .stdout
                    .lines()
                    .any(|line| line.trim() == package))
            }
            PackageBackend::Dnf => {
                let out = self.runner.run("dnf", &["versionlock", "list"]).await?;
                if !out.success() {
                    // Plugin not installed; nothing can be held.
                    return Ok(false);
                }
                Ok(out.stdout.lines().any(|line| line.contains(package)))
            }
        }
    }
}
