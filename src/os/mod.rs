//! Invocation-time preconditions: OS detection, privilege and tooling.
//!
//! All of these run before any step touches the host; a failure here
//! aborts with no rollback because nothing has been mutated yet.

use crate::context::command::CommandRunner;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

const OS_RELEASE_PATH: &str = "/etc/os-release";

#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("could not detect the operating system: {0}")]
    OsDetection(String),

    #[error("unsupported operating system: {0}")]
    UnsupportedOs(String),

    #[error("root privilege required (running as uid {0})")]
    NotRoot(u32),

    #[error("privilege check failed: {0}")]
    PrivilegeCheck(String),

    #[error("required tool not found on PATH: {0}")]
    MissingTool(String),
}

/// Which host package manager drives install/purge/hold operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageBackend {
    Apt,
    Dnf,
}

impl PackageBackend {
    /// The binary that must be present for this backend.
    pub fn tool(&self) -> &'static str {
        match self {
            PackageBackend::Apt => "apt-get",
            PackageBackend::Dnf => "dnf",
        }
    }
}

/// Identity fields read from /etc/os-release.
#[derive(Debug, Clone)]
pub struct OsInfo {
    pub id: String,
    pub id_like: Vec<String>,
    pub pretty_name: String,
}

/// Read and parse /etc/os-release.
pub async fn detect_os() -> Result<OsInfo, PreconditionError> {
    let raw = fs::read_to_string(Path::new(OS_RELEASE_PATH))
        .await
        .map_err(|e| PreconditionError::OsDetection(e.to_string()))?;
    Ok(parse_os_release(&raw))
}

/// os-release is KEY=VALUE per line, values optionally quoted.
fn parse_os_release(raw: &str) -> OsInfo {
    let mut id = String::new();
    let mut id_like = Vec::new();
    let mut pretty_name = String::new();

    for line in raw.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim() {
            "ID" => id = value.to_string(),
            "ID_LIKE" => {
                id_like = value.split_whitespace().map(|s| s.to_string()).collect();
            }
            "PRETTY_NAME" => pretty_name = value.to_string(),
            _ => {}
        }
    }

    OsInfo {
        id,
        id_like,
        pretty_name,
    }
}

/// Map the detected OS onto a package backend, or refuse the host.
pub fn package_backend(os: &OsInfo) -> Result<PackageBackend, PreconditionError> {
    let mut families = vec![os.id.as_str()];
    families.extend(os.id_like.iter().map(|s| s.as_str()));

    for family in families {
        match family {
            "debian" | "ubuntu" => return Ok(PackageBackend::Apt),
            "fedora" | "rhel" | "centos" => return Ok(PackageBackend::Dnf),
            _ => {}
        }
    }

    let label = if os.pretty_name.is_empty() {
        os.id.clone()
    } else {
        os.pretty_name.clone()
    };
    Err(PreconditionError::UnsupportedOs(label))
}

/// Reconciling mutates the package database, unit files and root-owned
/// directories, so the process must run as root.
pub async fn require_root(runner: &CommandRunner) -> Result<(), PreconditionError> {
    let out = runner
        .run("id", &["-u"])
        .await
        .map_err(|e| PreconditionError::PrivilegeCheck(e.to_string()))?;
    let uid: u32 = out
        .stdout_trimmed()
        .parse()
        .map_err(|_| PreconditionError::PrivilegeCheck(out.stdout_trimmed().to_string()))?;
    if uid != 0 {
        return Err(PreconditionError::NotRoot(uid));
    }
    Ok(())
}

/// Verify the external tools every plan depends on before running any step.
pub async fn require_tools(
    runner: &CommandRunner,
    backend: PackageBackend,
) -> Result<(), PreconditionError> {
    for tool in ["systemctl", backend.tool()] {
        let found = matches!(
            runner.run("which", &[tool]).await,
            Ok(out) if out.success()
        );
        if !found {
            return Err(PreconditionError::MissingTool(tool.to_string()));
        }
    }
    Ok(())
}
