//! Types for reconciliation steps and their outcomes.

mod runner;

pub use runner::StepRunner;

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// How a step failure affects the overall run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criticality {
    /// Failure invalidates the run and triggers rollback.
    Fatal,
    /// Failure degrades the result but the run continues.
    BestEffort,
}

/// An idempotent operation against the managed host.
///
/// Actions are data rather than closures so the runner can classify
/// "already satisfied" conditions per action type and tests can assert
/// the contents of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    StopUnits(Vec<String>),
    DisableUnits(Vec<String>),
    MaskUnits(Vec<String>),
    UnmaskUnits(Vec<String>),
    EnableUnits(Vec<String>),
    StartUnits(Vec<String>),
    /// Bounded readiness poll: at most `attempts` probes at a fixed interval.
    WaitUnitActive {
        unit: String,
        attempts: u32,
        interval: Duration,
    },
    RemoveSnap(String),
    PurgePackage(String),
    InstallPackage(String),
    HoldPackage(String),
    UnholdPackage(String),
    BackupDir(PathBuf),
    RestoreBackup(PathBuf),
    RemoveDirs(Vec<PathBuf>),
    BlockDirs(Vec<PathBuf>),
    UnblockDirs(Vec<PathBuf>),
}

/// An ordered unit of work inside a plan. Immutable once defined.
#[derive(Debug, Clone)]
pub struct ReconciliationStep {
    pub name: String,
    pub action: StepAction,
    pub criticality: Criticality,
}

impl ReconciliationStep {
    /// A step whose failure triggers rollback.
    pub fn fatal(name: impl Into<String>, action: StepAction) -> Self {
        Self {
            name: name.into(),
            action,
            criticality: Criticality::Fatal,
        }
    }

    /// A step whose failure is logged but does not invalidate the run.
    pub fn best_effort(name: impl Into<String>, action: StepAction) -> Self {
        Self {
            name: name.into(),
            action,
            criticality: Criticality::BestEffort,
        }
    }
}

/// Classified outcome of executing one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepOutcome {
    Succeeded,
    SkippedAlreadySatisfied,
    Failed,
}

/// Per-step outcome, aggregated into a run report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub step: String,
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
