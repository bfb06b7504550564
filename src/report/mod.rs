//! Operator-facing rendering of run reports and verification checklists,
//! as text or as a single JSON document.

use crate::reconciler::{RunReport, RunStatus};
use crate::step::{ExecutionResult, StepOutcome};
use crate::verify::VerificationChecklist;
use std::fmt::Write;

fn outcome_label(outcome: StepOutcome) -> &'static str {
    match outcome {
        StepOutcome::Succeeded => "ok",
        StepOutcome::SkippedAlreadySatisfied => "skipped (already satisfied)",
        StepOutcome::Failed => "FAILED",
    }
}

fn push_results(out: &mut String, results: &[ExecutionResult]) {
    for result in results {
        match &result.message {
            Some(message) => {
                let _ = writeln!(
                    out,
                    "  {:<28} {} - {}",
                    result.step,
                    outcome_label(result.outcome),
                    message
                );
            }
            None => {
                let _ = writeln!(out, "  {:<28} {}", result.step, outcome_label(result.outcome));
            }
        }
    }
}

/// Text rendering of a run report, including operator guidance for the
/// non-clean terminal states.
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "reconciliation to '{}' finished: {}",
        report.target,
        match report.status {
            RunStatus::Complete => "complete",
            RunStatus::RolledBack => "rolled back",
            RunStatus::PartialFailure => "partial failure",
        }
    );
    push_results(&mut out, &report.results);

    match report.status {
        RunStatus::Complete => {}
        RunStatus::RolledBack => {
            let _ = writeln!(out, "rollback steps:");
            push_results(&mut out, &report.rollback_results);
            let _ = writeln!(
                out,
                "a required step failed; the system was returned toward its prior state. \
                 Re-run after investigating the failed step above."
            );
        }
        RunStatus::PartialFailure => {
            let _ = writeln!(
                out,
                "the target state was reached, but the optional steps marked FAILED \
                 above did not apply; the capabilities they provide are missing."
            );
        }
    }
    out
}

/// Text rendering of a verification checklist.
pub fn render_checklist(checklist: &VerificationChecklist) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "verification for '{}':", checklist.target);
    for check in &checklist.checks {
        let _ = writeln!(
            out,
            "  [{}] {:<36} {}",
            if check.passed { "pass" } else { "FAIL" },
            check.name,
            check.detail
        );
    }
    let _ = writeln!(out, "{}", checklist.summary());
    out
}

/// Combined machine-readable document for `--json`.
pub fn render_json(
    report: Option<&RunReport>,
    checklist: Option<&VerificationChecklist>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({
        "report": report,
        "verification": checklist,
    }))
}
