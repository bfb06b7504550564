//! Drives the host from its current state toward a target state by
//! executing a plan's steps strictly in order.

use crate::context::SystemContext;
use crate::plan::{ReconciliationPlan, TargetState};
use crate::step::{Criticality, ExecutionResult, ReconciliationStep, StepOutcome, StepRunner};
use crate::utils::now_iso;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    /// Every step succeeded or was already satisfied.
    Complete,
    /// A fatal step failed; the rollback list was executed.
    RolledBack,
    /// One or more best-effort steps failed; the target state is otherwise
    /// considered reached.
    PartialFailure,
}

/// Lifecycle of a single reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Finished(RunStatus),
}

/// The full outcome of executing a plan. Printed for the operator and
/// mapped to the process exit code; never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub target: TargetState,
    pub started_at: String,
    pub finished_at: String,
    pub status: RunStatus,
    pub results: Vec<ExecutionResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rollback_results: Vec<ExecutionResult>,
}

impl RunReport {
    /// 0 only when the run completed cleanly.
    pub fn exit_code(&self) -> u8 {
        match self.status {
            RunStatus::Complete => 0,
            RunStatus::RolledBack | RunStatus::PartialFailure => 1,
        }
    }
}

/// Single-use plan executor: `Idle -> Running -> terminal`. `run`
/// consumes the reconciler, so a new cycle always starts fresh.
pub struct Reconciler {
    ctx: SystemContext,
    state: RunState,
}

impl Reconciler {
    pub fn new(ctx: SystemContext) -> Self {
        Self {
            ctx,
            state: RunState::Idle,
        }
    }

    pub async fn run(mut self, plan: ReconciliationPlan) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = now_iso();
        self.state = RunState::Running;
        info!(
            run_id = %run_id,
            target = %plan.target,
            steps = plan.steps.len(),
            "starting reconciliation"
        );

        let runner = StepRunner::new(self.ctx.clone());
        let mut results = Vec::with_capacity(plan.steps.len());
        let mut degraded = false;

        for step in &plan.steps {
            let result = runner.run(step).await;
            match (result.outcome, step.criticality) {
                (StepOutcome::Failed, Criticality::Fatal) => {
                    error!(
                        step = %step.name,
                        detail = result.message.as_deref().unwrap_or(""),
                        "fatal step failed, rolling back"
                    );
                    results.push(result);
                    let rollback_results = self.run_rollback(&runner, &plan.rollback).await;
                    self.state = RunState::Finished(RunStatus::RolledBack);
                    return RunReport {
                        run_id,
                        target: plan.target,
                        started_at,
                        finished_at: now_iso(),
                        status: RunStatus::RolledBack,
                        results,
                        rollback_results,
                    };
                }
                (StepOutcome::Failed, Criticality::BestEffort) => {
                    warn!(
                        step = %step.name,
                        detail = result.message.as_deref().unwrap_or(""),
                        "optional step failed, continuing"
                    );
                    degraded = true;
                }
                (StepOutcome::Succeeded, _) => {
                    info!(step = %step.name, "succeeded");
                }
                (StepOutcome::SkippedAlreadySatisfied, _) => {
                    info!(step = %step.name, "already satisfied");
                }
            }
            results.push(result);
        }

        let status = if degraded {
            RunStatus::PartialFailure
        } else {
            RunStatus::Complete
        };
        self.state = RunState::Finished(status);
        info!(run_id = %run_id, state = ?self.state, "reconciliation finished");

        RunReport {
            run_id,
            target: plan.target,
            started_at,
            finished_at: now_iso(),
            status,
            results,
            rollback_results: Vec::new(),
        }
    }

    /// Rollback is inherently best-effort: the host is already in an
    /// inconsistent state, so failures are logged and never re-raised.
    async fn run_rollback(
        &self,
        runner: &StepRunner,
        steps: &[ReconciliationStep],
    ) -> Vec<ExecutionResult> {
        info!(steps = steps.len(), "executing rollback plan");
        let mut results = Vec::with_capacity(steps.len());
        for step in steps {
            let result = runner.run(step).await;
            if result.outcome == StepOutcome::Failed {
                error!(
                    step = %step.name,
                    detail = result.message.as_deref().unwrap_or(""),
                    "rollback step failed"
                );
            }
            results.push(result);
        }
        results
    }
}
