//! Post-run verification: does the host actually match the target state?
//!
//! The probe never trusts the reconciler's bookkeeping - a step can report
//! success without the host ending up where it should (an externally
//! restarted service, a package reinstalled behind our back). Every check
//! is an independent read-only query; nothing here remediates.

use crate::config::SnapgateConfig;
use crate::context::{SystemContext, SystemError};
use crate::plan::TargetState;
use serde::Serialize;
use tracing::debug;

/// One pass/fail post-condition probe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Outcome of all checks for one target state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationChecklist {
    pub target: TargetState,
    pub checks: Vec<CheckResult>,
}

impl VerificationChecklist {
    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn total(&self) -> usize {
        self.checks.len()
    }

    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn summary(&self) -> String {
        format!("{}/{} checks passed", self.passed(), self.total())
    }
}

pub struct VerificationProbe {
    ctx: SystemContext,
    config: SnapgateConfig,
}

impl VerificationProbe {
    pub fn new(ctx: SystemContext, config: SnapgateConfig) -> Self {
        Self { ctx, config }
    }

    pub async fn assess(&self, target: TargetState) -> VerificationChecklist {
        debug!(target = %target, "running verification checks");
        let checks = match target {
            TargetState::Disabled => self.assess_disabled().await,
            TargetState::Enabled => self.assess_enabled().await,
        };
        VerificationChecklist { target, checks }
    }

    async fn assess_disabled(&self) -> Vec<CheckResult> {
        let mut checks = Vec::new();

        for unit in &self.config.units {
            checks.push(expect_bool(
                format!("unit-{unit}-inactive"),
                self.ctx.services.is_active(unit).await,
                false,
                "inactive",
                "still active",
            ));
            checks.push(expect_bool(
                format!("unit-{unit}-masked"),
                self.ctx.services.is_masked(unit).await,
                true,
                "masked",
                "not masked",
            ));
        }

        checks.push(expect_bool(
            format!("package-{}-purged", self.config.snap_package),
            self.ctx.packages.is_installed(&self.config.snap_package).await,
            false,
            "not installed",
            "still installed",
        ));
        checks.push(expect_bool(
            format!("package-{}-held", self.config.snap_package),
            self.ctx.packages.is_held(&self.config.snap_package).await,
            true,
            "held",
            "not held",
        ));

        let available = self.ctx.snaps.available().await;
        checks.push(CheckResult {
            name: "snap-command-absent".to_string(),
            passed: !available,
            detail: if available {
                "snap command still responds".to_string()
            } else {
                "snap command gone".to_string()
            },
        });

        for dir in &self.config.blocked_dirs {
            checks.push(expect_bool(
                format!("dir-{}-blocked", dir.display()),
                self.ctx.fs.is_blocked(dir).await,
                true,
                "blocked",
                "not blocked",
            ));
        }

        for dir in &self.config.state_dirs {
            if self.config.blocked_dirs.contains(dir) {
                continue;
            }
            let exists = self.ctx.fs.exists(dir).await;
            checks.push(CheckResult {
                name: format!("dir-{}-absent", dir.display()),
                passed: !exists,
                detail: if exists {
                    "still present".to_string()
                } else {
                    "removed".to_string()
                },
            });
        }

        let has_backup = self.ctx.fs.has_backup(&self.config.config_dir).await;
        checks.push(CheckResult {
            name: "backup-present".to_string(),
            passed: has_backup,
            detail: if has_backup {
                "config backup available for re-enable".to_string()
            } else {
                "no config backup found".to_string()
            },
        });

        checks
    }

    async fn assess_enabled(&self) -> Vec<CheckResult> {
        let mut checks = Vec::new();

        for unit in &self.config.units {
            checks.push(expect_bool(
                format!("unit-{unit}-active"),
                self.ctx.services.is_active(unit).await,
                true,
                "active",
                "not active",
            ));
            checks.push(expect_bool(
                format!("unit-{unit}-unmasked"),
                self.ctx.services.is_masked(unit).await,
                false,
                "not masked",
                "masked",
            ));
        }

        checks.push(expect_bool(
            format!("package-{}-installed", self.config.snap_package),
            self.ctx.packages.is_installed(&self.config.snap_package).await,
            true,
            "installed",
            "not installed",
        ));
        checks.push(expect_bool(
            format!("package-{}-unheld", self.config.snap_package),
            self.ctx.packages.is_held(&self.config.snap_package).await,
            false,
            "not held",
            "still held",
        ));

        let available = self.ctx.snaps.available().await;
        checks.push(CheckResult {
            name: "snap-command-available".to_string(),
            passed: available,
            detail: if available {
                "snap command responds".to_string()
            } else {
                "snap command missing".to_string()
            },
        });

        for dir in &self.config.blocked_dirs {
            checks.push(expect_bool(
                format!("dir-{}-unblocked", dir.display()),
                self.ctx.fs.is_blocked(dir).await,
                false,
                "unblocked",
                "still blocked",
            ));
        }

        checks
    }
}

/// Fold a read-only query into a check. A query error is a failed check
/// with the error as detail, never a probe abort.
fn expect_bool(
    name: String,
    observed: Result<bool, SystemError>,
    expected: bool,
    pass_detail: &str,
    fail_detail: &str,
) -> CheckResult {
    match observed {
        Ok(value) if value == expected => CheckResult {
            name,
            passed: true,
            detail: pass_detail.to_string(),
        },
        Ok(_) => CheckResult {
            name,
            passed: false,
            detail: fail_detail.to_string(),
        },
        Err(e) => CheckResult {
            name,
            passed: false,
            detail: format!("check failed: {e}"),
        },
    }
}
