//! Executes a single reconciliation step and classifies its outcome.

use super::{ExecutionResult, ReconciliationStep, StepAction, StepOutcome};
use crate::context::{Change, SystemContext, SystemError};
use std::path::PathBuf;
use tracing::debug;

/// Stateless executor for one step at a time.
///
/// The runner never raises: every result, including failure, becomes an
/// [`ExecutionResult`]. "Already in the target state" conditions are
/// classified by the collaborators per operation and surface here as
/// [`StepOutcome::SkippedAlreadySatisfied`].
pub struct StepRunner {
    ctx: SystemContext,
}

impl StepRunner {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, step: &ReconciliationStep) -> ExecutionResult {
        debug!(step = %step.name, "executing step");
        match self.apply(&step.action).await {
            Ok(Change::Applied) => ExecutionResult {
                step: step.name.clone(),
                outcome: StepOutcome::Succeeded,
                message: None,
            },
            Ok(Change::AlreadySatisfied) => ExecutionResult {
                step: step.name.clone(),
                outcome: StepOutcome::SkippedAlreadySatisfied,
                message: None,
            },
            Err(e) => ExecutionResult {
                step: step.name.clone(),
                outcome: StepOutcome::Failed,
                message: Some(e.to_string()),
            },
        }
    }

    async fn apply(&self, action: &StepAction) -> Result<Change, SystemError> {
        match action {
            StepAction::StopUnits(units) => {
                let mut change = Change::AlreadySatisfied;
                for unit in units {
                    if self.ctx.services.stop(unit).await? == Change::Applied {
                        change = Change::Applied;
                    }
                }
                Ok(change)
            }
            StepAction::DisableUnits(units) => {
                let mut change = Change::AlreadySatisfied;
                for unit in units {
                    if self.ctx.services.disable(unit).await? == Change::Applied {
                        change = Change::Applied;
                    }
                }
                Ok(change)
            }
            StepAction::MaskUnits(units) => {
                let mut change = Change::AlreadySatisfied;
                for unit in units {
                    if self.ctx.services.mask(unit).await? == Change::Applied {
                        change = Change::Applied;
                    }
                }
                Ok(change)
            }
            StepAction::UnmaskUnits(units) => {
                let mut change = Change::AlreadySatisfied;
                for unit in units {
                    if self.ctx.services.unmask(unit).await? == Change::Applied {
                        change = Change::Applied;
                    }
                }
                Ok(change)
            }
            StepAction::EnableUnits(units) => {
                let mut change = Change::AlreadySatisfied;
                for unit in units {
                    if self.ctx.services.enable(unit).await? == Change::Applied {
                        change = Change::Applied;
                    }
                }
                Ok(change)
            }
            StepAction::StartUnits(units) => {
                let mut change = Change::AlreadySatisfied;
                for unit in units {
                    if self.ctx.services.start(unit).await? == Change::Applied {
                        change = Change::Applied;
                    }
                }
                Ok(change)
            }
            StepAction::WaitUnitActive {
                unit,
                attempts,
                interval,
            } => self.wait_unit_active(unit, *attempts, *interval).await,
            StepAction::RemoveSnap(name) => self.ctx.snaps.remove(name).await,
            StepAction::PurgePackage(package) => self.ctx.packages.purge(package).await,
            StepAction::InstallPackage(package) => self.ctx.packages.install(package).await,
            StepAction::HoldPackage(package) => self.ctx.packages.hold(package).await,
            StepAction::UnholdPackage(package) => self.ctx.packages.unhold(package).await,
            StepAction::BackupDir(path) => self.ctx.fs.backup(path).await,
            StepAction::RestoreBackup(path) => self.ctx.fs.restore_latest(path).await,
            StepAction::RemoveDirs(paths) => self.each_dir(paths, DirOp::Remove).await,
            StepAction::BlockDirs(paths) => self.each_dir(paths, DirOp::Block).await,
            StepAction::UnblockDirs(paths) => self.each_dir(paths, DirOp::Unblock).await,
        }
    }

    async fn each_dir(&self, paths: &[PathBuf], op: DirOp) -> Result<Change, SystemError> {
        let mut change = Change::AlreadySatisfied;
        for path in paths {
            let applied = match op {
                DirOp::Remove => {
                    // A blocker directory is the desired end state of that
                    // path; deleting it just to recreate it is not
                    // idempotent.
                    if self.ctx.fs.is_blocked(path).await? {
                        Change::AlreadySatisfied
                    } else {
                        self.ctx.fs.remove_dir(path).await?
                    }
                }
                DirOp::Block => self.ctx.fs.block_dir(path).await?,
                DirOp::Unblock => self.ctx.fs.unblock_dir(path).await?,
            };
            if applied == Change::Applied {
                change = Change::Applied;
            }
        }
        Ok(change)
    }

    /// Bounded poll: already active on the first probe is a no-op; turning
    /// active within the attempt ceiling is applied work; anything else is
    /// a failure.
    async fn wait_unit_active(
        &self,
        unit: &str,
        attempts: u32,
        interval: std::time::Duration,
    ) -> Result<Change, SystemError> {
        for attempt in 1..=attempts {
            if self.ctx.services.is_active(unit).await? {
                return Ok(if attempt == 1 {
                    Change::AlreadySatisfied
                } else {
                    Change::Applied
                });
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }
        Err(SystemError::NotReady {
            unit: unit.to_string(),
            attempts,
        })
    }
}

enum DirOp {
    Remove,
    Block,
    Unblock,
}
