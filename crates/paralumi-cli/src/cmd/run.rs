use crate::output::{print_json, print_table, ConsoleSink};
use anyhow::Context;
use clap::Args;
use paralumi_core::{
    CancelToken, ConfigSelector, FileConfig, OperationKind, Orchestrator, ProjectSettings,
    RunReport, RunRequest, RunSettings, REPORT_HEADERS,
};
use pulumi_driver::PulumiCli;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RunArgs {
    /// Organization whose environments are scanned
    #[arg(long, env = "PARALUMI_ORG")]
    pub org: String,

    /// Environment selector, as <key>:<value> under pulumiConfig
    #[arg(
        long = "config",
        value_name = "KEY:VALUE",
        env = "PARALUMI_CONFIG",
        value_parser = parse_selector
    )]
    pub selector: ConfigSelector,

    /// Base stack name; each environment gets <env>-<base>
    #[arg(long, alias = "stackName", env = "PARALUMI_STACK_NAME")]
    pub stack_name: String,

    /// Project name (default: `name` from Pulumi.yaml)
    #[arg(long)]
    pub project: Option<String>,

    /// Maximum environments processed at once (default: unbounded)
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pub max_concurrency: Option<usize>,

    /// Seconds any single pulumi invocation may take
    #[arg(long, value_name = "SECS")]
    pub call_timeout: Option<u64>,

    /// Exit non-zero when any environment's operation fails
    #[arg(long)]
    pub fail_on_error: bool,

    /// Directory that receives the <kind>-stdout/ folder
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// Path to the pulumi executable (default: found on PATH)
    #[arg(long, env = "PARALUMI_PULUMI")]
    pub pulumi: Option<PathBuf>,
}

fn parse_selector(raw: &str) -> Result<ConfigSelector, String> {
    ConfigSelector::parse(raw).map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, kind: OperationKind, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let file = FileConfig::load(root).context("failed to load paralumi.yaml")?;
    let settings = merge_settings(root, &file, &args);

    let project = match args.project.clone() {
        Some(name) => name,
        None => {
            ProjectSettings::load(root)
                .context("failed to determine the project name")?
                .name
        }
    };

    let explicit = args.pulumi.as_deref().or(file.pulumi_path.as_deref());
    let driver = Arc::new(
        PulumiCli::locate(explicit, root).context("failed to locate the pulumi executable")?,
    );
    tracing::debug!(exe = %driver.exe().display(), root = %root.display(), "using pulumi");

    let request = RunRequest {
        kind,
        org: args.org,
        project,
        selector: args.selector,
        base_stack_name: args.stack_name,
    };

    let fail_on_partial_failure = settings.fail_on_partial_failure;
    let cancel = CancelToken::new();
    let orchestrator = Orchestrator::new(driver.clone(), driver)
        .with_settings(settings)
        .with_sink(Arc::new(ConsoleSink))
        .with_cancel(cancel.clone());

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async move {
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("interrupted, stopping in-flight pulumi commands");
                cancel.cancel();
            }
        });
        let result = orchestrator.run(&request).await;
        watcher.abort();
        result
    })?;

    print_report(&report, json)?;

    if fail_on_partial_failure && report.has_failures() {
        anyhow::bail!(
            "{} failed in {} environment(s): {}",
            kind,
            report.failed.len(),
            report.failed.join(", ")
        );
    }
    Ok(())
}

/// Flags override `paralumi.yaml`, which overrides the defaults.
fn merge_settings(root: &Path, file: &FileConfig, args: &RunArgs) -> RunSettings {
    let mut settings = RunSettings::from_file(root, file);
    if let Some(n) = args.max_concurrency {
        settings.max_concurrency = Some(n);
    }
    if let Some(secs) = args.call_timeout {
        settings.call_timeout = Some(Duration::from_secs(secs));
    }
    if args.fail_on_error {
        settings.fail_on_partial_failure = true;
    }
    if let Some(dir) = &args.output_root {
        settings.output_root = if dir.is_absolute() {
            dir.clone()
        } else {
            root.join(dir)
        };
    }
    settings
}

fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(report);
    }
    println!();
    print_table(REPORT_HEADERS, report.rows());
    Ok(())
}
