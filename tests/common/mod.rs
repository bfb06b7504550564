//! Shared fake collaborators for integration tests.
//!
//! `FakeHost` implements every `SystemContext` trait against one shared
//! in-memory state, records each mutating call, and can be told to fail
//! specific operations by key (e.g. `purge:snapd`).

#![allow(dead_code)]

use async_trait::async_trait;
use snapgate::{
    Change, FsManager, PackageManager, ServiceManager, SnapClient, SystemContext, SystemError,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const UNITS: [&str; 3] = ["snapd.socket", "snapd.service", "snapd.seeded.service"];

#[derive(Debug, Default)]
pub struct FakeState {
    pub active_units: HashSet<String>,
    pub enabled_units: HashSet<String>,
    pub masked_units: HashSet<String>,
    pub installed_packages: HashSet<String>,
    pub held_packages: HashSet<String>,
    pub installed_snaps: Vec<String>,
    pub dirs: HashSet<PathBuf>,
    pub blocked_dirs: HashSet<PathBuf>,
    /// Backups per source directory.
    pub backups: HashMap<PathBuf, u32>,
    /// Operation keys that should fail, e.g. "purge:snapd".
    pub fail_actions: HashSet<String>,
    /// Every mutating call, in order.
    pub calls: Vec<String>,
}

impl FakeState {
    fn fail_if_scripted(&self, key: &str) -> Result<(), SystemError> {
        if self.fail_actions.contains(key) {
            return Err(SystemError::CommandFailed {
                command: key.to_string(),
                detail: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

pub struct FakeHost {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeHost {
    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }
}

#[async_trait]
impl ServiceManager for FakeHost {
    async fn stop(&self, unit: &str) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("stop:{unit}"));
            s.fail_if_scripted(&format!("stop:{unit}"))?;
            Ok(if s.active_units.remove(unit) {
                Change::Applied
            } else {
                Change::AlreadySatisfied
            })
        })
    }

    async fn disable(&self, unit: &str) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("disable:{unit}"));
            s.fail_if_scripted(&format!("disable:{unit}"))?;
            Ok(if s.enabled_units.remove(unit) {
                Change::Applied
            } else {
                Change::AlreadySatisfied
            })
        })
    }

    async fn mask(&self, unit: &str) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("mask:{unit}"));
            s.fail_if_scripted(&format!("mask:{unit}"))?;
            Ok(if s.masked_units.insert(unit.to_string()) {
                Change::Applied
            } else {
                Change::AlreadySatisfied
            })
        })
    }

    async fn unmask(&self, unit: &str) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("unmask:{unit}"));
            s.fail_if_scripted(&format!("unmask:{unit}"))?;
            Ok(if s.masked_units.remove(unit) {
                Change::Applied
            } else {
                Change::AlreadySatisfied
            })
        })
    }

    async fn enable(&self, unit: &str) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("enable:{unit}"));
            s.fail_if_scripted(&format!("enable:{unit}"))?;
            Ok(if s.enabled_units.insert(unit.to_string()) {
                Change::Applied
            } else {
                Change::AlreadySatisfied
            })
        })
    }

    async fn start(&self, unit: &str) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("start:{unit}"));
            s.fail_if_scripted(&format!("start:{unit}"))?;
            Ok(if s.active_units.insert(unit.to_string()) {
                Change::Applied
            } else {
                Change::AlreadySatisfied
            })
        })
    }

    async fn is_active(&self, unit: &str) -> Result<bool, SystemError> {
        self.with_state(|s| {
            s.fail_if_scripted(&format!("is-active:{unit}"))?;
            Ok(s.active_units.contains(unit))
        })
    }

    async fn is_masked(&self, unit: &str) -> Result<bool, SystemError> {
        self.with_state(|s| Ok(s.masked_units.contains(unit)))
    }

    async fn is_enabled(&self, unit: &str) -> Result<bool, SystemError> {
        self.with_state(|s| Ok(s.enabled_units.contains(unit)))
    }
}

#[async_trait]
impl PackageManager for FakeHost {
    async fn install(&self, package: &str) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("install:{package}"));
            s.fail_if_scripted(&format!("install:{package}"))?;
            Ok(if s.installed_packages.insert(package.to_string()) {
                Change::Applied
            } else {
                Change::AlreadySatisfied
            })
        })
    }

    async fn purge(&self, package: &str) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("purge:{package}"));
            s.fail_if_scripted(&format!("purge:{package}"))?;
            Ok(if s.installed_packages.remove(package) {
                Change::Applied
            } else {
                Change::AlreadySatisfied
            })
        })
    }

    async fn hold(&self, package: &str) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("hold:{package}"));
            s.fail_if_scripted(&format!("hold:{package}"))?;
            Ok(if s.held_packages.insert(package.to_string()) {
                Change::Applied
            } else {
                Change::AlreadySatisfied
            })
        })
    }

    async fn unhold(&self, package: &str) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("unhold:{package}"));
            s.fail_if_scripted(&format!("unhold:{package}"))?;
            Ok(if s.held_packages.remove(package) {
                Change::Applied
            } else {
                Change::AlreadySatisfied
            })
        })
    }

    async fn is_installed(&self, package: &str) -> Result<bool, SystemError> {
        self.with_state(|s| Ok(s.installed_packages.contains(package)))
    }

    async fn is_held(&self, package: &str) -> Result<bool, SystemError> {
        self.with_state(|s| Ok(s.held_packages.contains(package)))
    }
}

#[async_trait]
impl SnapClient for FakeHost {
    async fn available(&self) -> bool {
        self.with_state(|s| s.installed_packages.contains("snapd"))
    }

    async fn installed_snaps(&self) -> Result<Vec<String>, SystemError> {
        self.with_state(|s| {
            if !s.installed_packages.contains("snapd") {
                return Ok(Vec::new());
            }
            Ok(s.installed_snaps.clone())
        })
    }

    async fn remove(&self, name: &str) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("remove-snap:{name}"));
            s.fail_if_scripted(&format!("remove-snap:{name}"))?;
            match s.installed_snaps.iter().position(|n| n == name) {
                Some(pos) => {
                    s.installed_snaps.remove(pos);
                    Ok(Change::Applied)
                }
                None => Ok(Change::AlreadySatisfied),
            }
        })
    }
}

#[async_trait]
impl FsManager for FakeHost {
    async fn exists(&self, path: &Path) -> bool {
        self.with_state(|s| s.dirs.contains(path))
    }

    async fn remove_dir(&self, path: &Path) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("remove-dir:{}", path.display()));
            s.fail_if_scripted(&format!("remove-dir:{}", path.display()))?;
            Ok(if s.dirs.remove(path) {
                Change::Applied
            } else {
                Change::AlreadySatisfied
            })
        })
    }

    async fn block_dir(&self, path: &Path) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("block-dir:{}", path.display()));
            s.fail_if_scripted(&format!("block-dir:{}", path.display()))?;
            if s.blocked_dirs.contains(path) {
                return Ok(Change::AlreadySatisfied);
            }
            s.blocked_dirs.insert(path.to_path_buf());
            s.dirs.insert(path.to_path_buf());
            Ok(Change::Applied)
        })
    }

    async fn unblock_dir(&self, path: &Path) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("unblock-dir:{}", path.display()));
            s.fail_if_scripted(&format!("unblock-dir:{}", path.display()))?;
            Ok(if s.blocked_dirs.remove(path) {
                Change::Applied
            } else {
                Change::AlreadySatisfied
            })
        })
    }

    async fn is_blocked(&self, path: &Path) -> Result<bool, SystemError> {
        self.with_state(|s| Ok(s.blocked_dirs.contains(path)))
    }

    async fn backup(&self, src: &Path) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("backup:{}", src.display()));
            s.fail_if_scripted(&format!("backup:{}", src.display()))?;
            if !s.dirs.contains(src) {
                return Ok(Change::AlreadySatisfied);
            }
            *s.backups.entry(src.to_path_buf()).or_insert(0) += 1;
            Ok(Change::Applied)
        })
    }

    async fn restore_latest(&self, src: &Path) -> Result<Change, SystemError> {
        self.with_state(|s| {
            s.calls.push(format!("restore:{}", src.display()));
            s.fail_if_scripted(&format!("restore:{}", src.display()))?;
            if s.backups.get(src).copied().unwrap_or(0) == 0 {
                return Ok(Change::AlreadySatisfied);
            }
            s.dirs.insert(src.to_path_buf());
            Ok(Change::Applied)
        })
    }

    async fn has_backup(&self, src: &Path) -> bool {
        self.with_state(|s| s.backups.get(src).copied().unwrap_or(0) > 0)
    }
}

/// Wire a state into a `SystemContext` backed entirely by the fake.
pub fn context_from(state: FakeState) -> (SystemContext, Arc<Mutex<FakeState>>) {
    let shared = Arc::new(Mutex::new(state));
    let host = Arc::new(FakeHost {
        state: shared.clone(),
    });
    let ctx = SystemContext::new(host.clone(), host.clone(), host.clone(), host);
    (ctx, shared)
}

/// A host with the snap subsystem fully installed and running.
pub fn enabled_state_with_snaps(snaps: &[&str]) -> FakeState {
    FakeState {
        active_units: UNITS.iter().map(|u| u.to_string()).collect(),
        enabled_units: UNITS.iter().map(|u| u.to_string()).collect(),
        installed_packages: ["snapd".to_string()].into_iter().collect(),
        installed_snaps: snaps.iter().map(|s| s.to_string()).collect(),
        dirs: [
            "/var/lib/snapd",
            "/var/cache/snapd",
            "/var/snap",
            "/snap",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect(),
        ..FakeState::default()
    }
}

pub fn enabled_state() -> FakeState {
    enabled_state_with_snaps(&[])
}

/// A host after a clean disable run: units masked, package purged and
/// held, blocker directories in place, one config backup on disk.
pub fn disabled_state() -> FakeState {
    FakeState {
        masked_units: UNITS.iter().map(|u| u.to_string()).collect(),
        held_packages: ["snapd".to_string()].into_iter().collect(),
        dirs: ["/snap", "/var/snap"].into_iter().map(PathBuf::from).collect(),
        blocked_dirs: ["/snap", "/var/snap"]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
        backups: [(PathBuf::from("/var/lib/snapd"), 1)].into_iter().collect(),
        ..FakeState::default()
    }
}
