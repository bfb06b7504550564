//! Plan construction: the ordered step lists for each target state.
//!
//! Ordering inside a plan is a hard invariant. Services stop before the
//! files backing them are deleted, the config backup lands before the
//! first destructive step, and the package pin comes off before a
//! reinstall. Tests assert these pairs against the built plans.

use crate::config::SnapgateConfig;
use crate::context::{SystemContext, SystemError};
use crate::step::{ReconciliationStep, StepAction};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// One of the two supported end states of the managed subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    Enabled,
    Disabled,
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetState::Enabled => write!(f, "enabled"),
            TargetState::Disabled => write!(f, "disabled"),
        }
    }
}

/// The ordered steps for one target state, plus the fixed, shorter
/// rollback list executed when a fatal step fails.
#[derive(Debug, Clone)]
pub struct ReconciliationPlan {
    pub target: TargetState,
    pub steps: Vec<ReconciliationStep>,
    pub rollback: Vec<ReconciliationStep>,
}

impl ReconciliationPlan {
    /// Position of a step by name, for order assertions.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }
}

/// Build the plan for a target state. Disabling inspects the host first:
/// every installed snap package gets its own removal step.
pub async fn build_plan(
    target: TargetState,
    ctx: &SystemContext,
    config: &SnapgateConfig,
) -> Result<ReconciliationPlan, SystemError> {
    match target {
        TargetState::Disabled => disable_plan(ctx, config).await,
        TargetState::Enabled => Ok(enable_plan(config)),
    }
}

pub async fn disable_plan(
    ctx: &SystemContext,
    config: &SnapgateConfig,
) -> Result<ReconciliationPlan, SystemError> {
    let units = config.units.clone();

    let mut steps = vec![
        ReconciliationStep::fatal("stop-services", StepAction::StopUnits(units.clone())),
        ReconciliationStep::fatal("disable-services", StepAction::DisableUnits(units.clone())),
        ReconciliationStep::fatal("mask-services", StepAction::MaskUnits(units.clone())),
        // Last chance to capture config before anything destructive runs.
        ReconciliationStep::fatal("backup-config", StepAction::BackupDir(config.config_dir.clone())),
    ];

    let installed = ctx.snaps.installed_snaps().await?;
    for snap in removal_order(installed, &config.snap_package) {
        steps.push(ReconciliationStep::best_effort(
            format!("remove-package-{snap}"),
            StepAction::RemoveSnap(snap),
        ));
    }

    steps.push(ReconciliationStep::fatal(
        "purge-core",
        StepAction::PurgePackage(config.snap_package.clone()),
    ));
    steps.push(ReconciliationStep::best_effort(
        "hold-package",
        StepAction::HoldPackage(config.snap_package.clone()),
    ));
    steps.push(ReconciliationStep::best_effort(
        "remove-directories",
        StepAction::RemoveDirs(config.state_dirs.clone()),
    ));
    steps.push(ReconciliationStep::best_effort(
        "block-directories",
        StepAction::BlockDirs(config.blocked_dirs.clone()),
    ));

    let rollback = vec![
        ReconciliationStep::best_effort("unmask-services", StepAction::UnmaskUnits(units.clone())),
        ReconciliationStep::best_effort("enable-services", StepAction::EnableUnits(units.clone())),
        ReconciliationStep::best_effort(
            "unhold-package",
            StepAction::UnholdPackage(config.snap_package.clone()),
        ),
        ReconciliationStep::best_effort(
            "restore-config",
            StepAction::RestoreBackup(config.config_dir.clone()),
        ),
        ReconciliationStep::best_effort(
            "unblock-directories",
            StepAction::UnblockDirs(config.blocked_dirs.clone()),
        ),
        ReconciliationStep::best_effort("start-services", StepAction::StartUnits(units)),
    ];

    Ok(ReconciliationPlan {
        target: TargetState::Disabled,
        steps,
        rollback,
    })
}

/// Enabling restores the subsystem, not the snap packages a previous
/// disable removed; those stay gone until the operator reinstalls them.
pub fn enable_plan(config: &SnapgateConfig) -> ReconciliationPlan {
    let units = config.units.clone();

    let steps = vec![
        // The pin must come off before the package manager will reinstall.
        ReconciliationStep::fatal(
            "unhold-package",
            StepAction::UnholdPackage(config.snap_package.clone()),
        ),
        ReconciliationStep::fatal(
            "unblock-directories",
            StepAction::UnblockDirs(config.blocked_dirs.clone()),
        ),
        ReconciliationStep::fatal(
            "install-package",
            StepAction::InstallPackage(config.snap_package.clone()),
        ),
        ReconciliationStep::fatal("unmask-services", StepAction::UnmaskUnits(units.clone())),
        ReconciliationStep::fatal("enable-services", StepAction::EnableUnits(units.clone())),
        ReconciliationStep::fatal("start-services", StepAction::StartUnits(units.clone())),
        ReconciliationStep::fatal(
            "wait-ready",
            StepAction::WaitUnitActive {
                unit: config.ready_unit.clone(),
                attempts: config.poll_attempts,
                interval: Duration::from_millis(config.poll_interval_ms),
            },
        ),
        ReconciliationStep::best_effort(
            "restore-config",
            StepAction::RestoreBackup(config.config_dir.clone()),
        ),
    ];

    let rollback = vec![
        ReconciliationStep::best_effort("stop-services", StepAction::StopUnits(units.clone())),
        ReconciliationStep::best_effort("mask-services", StepAction::MaskUnits(units)),
        ReconciliationStep::best_effort(
            "hold-package",
            StepAction::HoldPackage(config.snap_package.clone()),
        ),
    ];

    ReconciliationPlan {
        target: TargetState::Enabled,
        steps,
        rollback,
    }
}

/// Removal order for installed snaps: leaf packages first, base snaps
/// last, the subsystem package itself excluded (it is purged through the
/// host package manager, which runs its own teardown hooks).
fn removal_order(installed: Vec<String>, subsystem_package: &str) -> Vec<String> {
    let (mut bases, mut leaves): (Vec<String>, Vec<String>) = installed
        .into_iter()
        .filter(|name| name != subsystem_package)
        .partition(|name| is_base_snap(name));
    leaves.sort();
    bases.sort();
    leaves.extend(bases);
    leaves
}

/// Base snaps other snaps mount on; they refuse removal while dependents
/// remain installed.
fn is_base_snap(name: &str) -> bool {
    name == "bare" || name == "snapd" || name.starts_with("core")
}
