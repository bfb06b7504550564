use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Default location for the host-wide configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/snapgate/config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

fn default_units() -> Vec<String> {
    vec![
        "snapd.socket".to_string(),
        "snapd.service".to_string(),
        "snapd.seeded.service".to_string(),
    ]
}

fn default_ready_unit() -> String {
    "snapd.service".to_string()
}

fn default_snap_package() -> String {
    "snapd".to_string()
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("/var/lib/snapd")
}

fn default_state_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/var/lib/snapd"),
        PathBuf::from("/var/cache/snapd"),
        PathBuf::from("/var/snap"),
        PathBuf::from("/snap"),
    ]
}

fn default_blocked_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("/snap"), PathBuf::from("/var/snap")]
}

/// 30 probes, one second apart.
fn default_poll_attempts() -> u32 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_lock_path() -> PathBuf {
    PathBuf::from("/run/snapgate.lock")
}

/// Snapgate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapgateConfig {
    /// systemd units belonging to the managed subsystem, in the order
    /// they are acted on.
    #[serde(default = "default_units")]
    pub units: Vec<String>,

    /// Unit whose active state signals the subsystem is ready after enable.
    #[serde(default = "default_ready_unit")]
    pub ready_unit: String,

    /// Host package providing the subsystem.
    #[serde(default = "default_snap_package")]
    pub snap_package: String,

    /// Directory backed up before any destructive step.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Directories deleted when disabling.
    #[serde(default = "default_state_dirs")]
    pub state_dirs: Vec<PathBuf>,

    /// Mount/seed points recreated as blocker directories after deletion.
    #[serde(default = "default_blocked_dirs")]
    pub blocked_dirs: Vec<PathBuf>,

    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_lock_path")]
    pub lock_path: PathBuf,
}

impl Default for SnapgateConfig {
    fn default() -> Self {
        Self {
            units: default_units(),
            ready_unit: default_ready_unit(),
            snap_package: default_snap_package(),
            config_dir: default_config_dir(),
            state_dirs: default_state_dirs(),
            blocked_dirs: default_blocked_dirs(),
            poll_attempts: default_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            lock_path: default_lock_path(),
        }
    }
}

/// Read the configuration file, falling back to defaults when the default
/// path holds no file. An explicitly given path must exist.
pub async fn read_config(path: Option<&Path>) -> Result<SnapgateConfig, ConfigError> {
    let (config_path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    if !explicit && !config_path.exists() {
        return Ok(SnapgateConfig::default());
    }

    let content = fs::read_to_string(&config_path).await?;
    let config: SnapgateConfig = serde_json::from_str(&content)?;
    Ok(config)
}
