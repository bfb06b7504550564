pub mod backup;
pub mod config;
pub mod context;
pub mod lockfile;
pub mod os;
pub mod plan;
pub mod reconciler;
pub mod report;
pub mod step;
pub mod utils;
pub mod verify;

// Re-export commonly used types
pub use backup::{create_backup, find_latest_backup, restore_backup, BackupError, BackupManifest};
pub use config::{read_config, ConfigError, SnapgateConfig};
pub use context::command::{CommandOutput, CommandRunner};
pub use context::fs::{FsManager, HostFs};
pub use context::packages::{HostPackageManager, PackageManager};
pub use context::services::{ServiceManager, SystemdManager};
pub use context::snaps::{HostSnapClient, SnapClient};
pub use context::{Change, SystemContext, SystemError};
pub use lockfile::{LockError, RunLock};
pub use os::{
    detect_os, package_backend, require_root, require_tools, OsInfo, PackageBackend,
    PreconditionError,
};
pub use plan::{build_plan, disable_plan, enable_plan, ReconciliationPlan, TargetState};
pub use reconciler::{Reconciler, RunReport, RunStatus};
pub use report::{render_checklist, render_json, render_report};
pub use step::{
    Criticality, ExecutionResult, ReconciliationStep, StepAction, StepOutcome, StepRunner,
};
pub use verify::{CheckResult, VerificationChecklist, VerificationProbe};
