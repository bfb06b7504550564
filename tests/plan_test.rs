mod common;

use common::{context_from, enabled_state_with_snaps};
use snapgate::{disable_plan, enable_plan, Criticality, SnapgateConfig};

/// Assert that `before` appears earlier than `after` in the plan.
fn assert_order(plan: &snapgate::ReconciliationPlan, before: &str, after: &str) {
    let b = plan
        .position(before)
        .unwrap_or_else(|| panic!("plan has no step named {before}"));
    let a = plan
        .position(after)
        .unwrap_or_else(|| panic!("plan has no step named {after}"));
    assert!(b < a, "{before} must run before {after} (got {b} vs {a})");
}

#[tokio::test]
async fn test_disable_plan_dependency_order() {
    let (ctx, _) = context_from(enabled_state_with_snaps(&["firefox", "core22"]));
    let config = SnapgateConfig::default();
    let plan = disable_plan(&ctx, &config).await.expect("plan should build");

    // Services must be stopped before anything that deletes their backing
    // state, and the backup must land before the first destructive step.
    let dependencies = [
        ("stop-services", "remove-package-firefox"),
        ("stop-services", "purge-core"),
        ("stop-services", "remove-directories"),
        ("disable-services", "purge-core"),
        ("mask-services", "purge-core"),
        ("backup-config", "remove-package-firefox"),
        ("backup-config", "purge-core"),
        ("backup-config", "remove-directories"),
        ("remove-directories", "block-directories"),
        ("purge-core", "hold-package"),
    ];
    for (before, after) in dependencies {
        assert_order(&plan, before, after);
    }
}

#[tokio::test]
async fn test_disable_plan_removes_leaf_snaps_before_bases() {
    let (ctx, _) = context_from(enabled_state_with_snaps(&["core22", "firefox"]));
    let config = SnapgateConfig::default();
    let plan = disable_plan(&ctx, &config).await.unwrap();

    assert_order(&plan, "remove-package-firefox", "remove-package-core22");
}

#[tokio::test]
async fn test_enable_plan_dependency_order() {
    let config = SnapgateConfig::default();
    let plan = enable_plan(&config);

    let dependencies = [
        ("unhold-package", "install-package"),
        ("unblock-directories", "install-package"),
        ("install-package", "unmask-services"),
        ("unmask-services", "enable-services"),
        ("enable-services", "start-services"),
        ("start-services", "wait-ready"),
        ("wait-ready", "restore-config"),
    ];
    for (before, after) in dependencies {
        assert_order(&plan, before, after);
    }
}

#[tokio::test]
async fn test_rollback_lists_are_fixed_and_shorter() {
    let (ctx, _) = context_from(enabled_state_with_snaps(&["firefox"]));
    let config = SnapgateConfig::default();

    let disable = disable_plan(&ctx, &config).await.unwrap();
    assert!(!disable.rollback.is_empty());
    assert!(disable.rollback.len() < disable.steps.len());
    assert!(disable.rollback.iter().any(|s| s.name == "restore-config"));
    assert!(disable.rollback.iter().any(|s| s.name == "unmask-services"));

    let enable = enable_plan(&config);
    assert!(!enable.rollback.is_empty());
    assert!(enable.rollback.len() < enable.steps.len());
}

#[tokio::test]
async fn test_disable_plan_criticality() {
    let (ctx, _) = context_from(enabled_state_with_snaps(&["firefox"]));
    let config = SnapgateConfig::default();
    let plan = disable_plan(&ctx, &config).await.unwrap();

    let criticality_of = |name: &str| {
        plan.steps
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.criticality)
            .unwrap_or_else(|| panic!("no step named {name}"))
    };

    assert_eq!(criticality_of("purge-core"), Criticality::Fatal);
    assert_eq!(criticality_of("backup-config"), Criticality::Fatal);
    assert_eq!(criticality_of("hold-package"), Criticality::BestEffort);
    assert_eq!(
        criticality_of("remove-package-firefox"),
        Criticality::BestEffort
    );
}
