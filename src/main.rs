use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use snapgate::{
    build_plan, detect_os, package_backend, read_config, render_checklist, render_json,
    render_report, require_root, require_tools, CommandRunner, Reconciler, RunLock, SnapgateConfig,
    SystemContext, TargetState, VerificationProbe,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Snapgate - drives the Snap subsystem between enabled and disabled states
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to the configuration file
    #[arg(long, env = "SNAPGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile toward the enabled state (does not reinstall previously
    /// removed snap packages; only the subsystem itself is restored)
    Enable {
        /// Skip the interactive confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Reconcile toward the disabled state
    Disable {
        /// Skip the interactive confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Only verify the host against a target state, change nothing
    Verify {
        /// Target state to verify against
        #[arg(long, value_enum)]
        target: TargetArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TargetArg {
    Enabled,
    Disabled,
}

impl From<TargetArg> for TargetState {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::Enabled => TargetState::Enabled,
            TargetArg::Disabled => TargetState::Disabled,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("snapgate: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = read_config(args.config.as_deref())
        .await
        .context("failed to load configuration")?;

    match args.command {
        Command::Enable { yes } => reconcile(TargetState::Enabled, yes, args.json, config).await,
        Command::Disable { yes } => reconcile(TargetState::Disabled, yes, args.json, config).await,
        Command::Verify { target } => verify_only(target.into(), args.json, config).await,
    }
}

async fn reconcile(
    target: TargetState,
    yes: bool,
    json: bool,
    config: SnapgateConfig,
) -> anyhow::Result<ExitCode> {
    let runner = CommandRunner::new();
    let os = detect_os().await?;
    let backend = package_backend(&os)?;
    require_root(&runner).await?;
    require_tools(&runner, backend).await?;
    info!(os = %os.pretty_name, backend = ?backend, target = %target, "preconditions satisfied");

    if !yes && !confirm(target)? {
        eprintln!("aborted, nothing was changed");
        return Ok(ExitCode::from(2));
    }

    // Held until this process exits; guards every mutation below.
    let _lock = RunLock::acquire(&config.lock_path)?;

    let ctx = SystemContext::host(backend);
    let plan = build_plan(target, &ctx, &config).await?;
    let report = Reconciler::new(ctx.clone()).run(plan).await;

    let checklist = VerificationProbe::new(ctx, config).assess(target).await;

    if json {
        println!("{}", render_json(Some(&report), Some(&checklist))?);
    } else {
        print!("{}", render_report(&report));
        print!("{}", render_checklist(&checklist));
    }

    Ok(ExitCode::from(report.exit_code()))
}

async fn verify_only(
    target: TargetState,
    json: bool,
    config: SnapgateConfig,
) -> anyhow::Result<ExitCode> {
    let os = detect_os().await?;
    let backend = package_backend(&os)?;

    let ctx = SystemContext::host(backend);
    let checklist = VerificationProbe::new(ctx, config).assess(target).await;

    if json {
        println!("{}", render_json(None, Some(&checklist))?);
    } else {
        print!("{}", render_checklist(&checklist));
    }

    Ok(ExitCode::from(if checklist.all_passed() { 0 } else { 1 }))
}

fn confirm(target: TargetState) -> std::io::Result<bool> {
    print!("About to reconcile the snap subsystem to the '{target}' state. Continue? [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "YES"))
}
