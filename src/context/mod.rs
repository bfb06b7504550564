//! The injected system collaborators a run operates through.
//!
//! All OS access goes through the trait objects held by [`SystemContext`]
//! so tests can substitute fakes for the service manager, the package
//! manager, the snap client and the filesystem.

pub mod command;
pub mod fs;
pub mod packages;
pub mod services;
pub mod snaps;

use crate::os::PackageBackend;
use command::{CommandError, CommandRunner};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SystemError {
    #[error("{command} failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backup error: {0}")]
    Backup(#[from] crate::backup::BackupError),

    #[error("unit {unit} did not become active after {attempts} attempts")]
    NotReady { unit: String, attempts: u32 },
}

/// Effect a mutating collaborator call had on the host.
///
/// `AlreadySatisfied` is the explicit replacement for the shell habit of
/// suppressing every non-zero exit code: the host implementations only
/// report it for the enumerated "already in this state" conditions of
/// each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Applied,
    AlreadySatisfied,
}

/// Handle on the managed host, with every collaborator injectable.
#[derive(Clone)]
pub struct SystemContext {
    pub services: Arc<dyn services::ServiceManager>,
    pub packages: Arc<dyn packages::PackageManager>,
    pub snaps: Arc<dyn snaps::SnapClient>,
    pub fs: Arc<dyn fs::FsManager>,
}

impl SystemContext {
    pub fn new(
        services: Arc<dyn services::ServiceManager>,
        packages: Arc<dyn packages::PackageManager>,
        snaps: Arc<dyn snaps::SnapClient>,
        fs: Arc<dyn fs::FsManager>,
    ) -> Self {
        Self {
            services,
            packages,
            snaps,
            fs,
        }
    }

    /// Context backed by the real host: systemctl, apt/dnf, snap and the
    /// local filesystem, sharing one command runner.
    pub fn host(backend: PackageBackend) -> Self {
        let runner = CommandRunner::new();
        Self {
            services: Arc::new(services::SystemdManager::new(runner.clone())),
            packages: Arc::new(packages::HostPackageManager::new(backend, runner.clone())),
            snaps: Arc::new(snaps::HostSnapClient::new(runner)),
            fs: Arc::new(fs::HostFs),
        }
    }
}
