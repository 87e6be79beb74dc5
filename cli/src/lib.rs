//! distkit CLI

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use distkit_core::config::DistkitConfig;
use distkit_core::fs::RealFileSystem;
use distkit_core::output::{write_json_pretty, write_ndjson};
use distkit_core::package::{PackageReport, Packager};
use distkit_core::pipeline::{AppPipeline, RunReport};
use distkit_core::prune::{prune_dependency_tree, remove_license_files, PruneReport};
use distkit_core::runner::{Echo, ShellRunner};

pub mod logging;

use logging::LogFormat;

const PROJECT_DIR_ENV: &str = "DISTKIT_PROJECT_DIR";

/// CLI entrypoint for distkit.
#[derive(Debug, Parser)]
#[command(
    name = "distkit",
    version,
    about = "Build, package and prune distributables for desktop apps"
)]
pub struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Log line format on stderr
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Clean, reinstall, build and prune the app, then list the installers
    App(AppArgs),
    /// Package one script into a single console executable
    Package(PackageArgs),
    /// Delete license files anywhere below a directory
    PruneLicenses(PruneArgs),
    /// Trim docs, tests and editor/VCS metadata from a dependency tree
    PruneDeps(PruneArgs),
}

#[derive(Debug, Args)]
struct ProjectArgs {
    /// Project directory (default: $DISTKIT_PROJECT_DIR, then the current directory)
    #[arg(long = "project-dir", value_hint = ValueHint::DirPath)]
    project_dir: Option<PathBuf>,

    /// JSON file overriding the built-in settings
    #[arg(long = "config", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct AppArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Skip license and dependency pruning after the build
    #[arg(long = "skip-prune", action = ArgAction::SetTrue)]
    skip_prune: bool,

    /// Emit the run report as a single JSON document
    #[arg(long = "json", action = ArgAction::SetTrue, conflicts_with = "ndjson")]
    json: bool,

    /// Emit one JSON line per stage and per installer
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,
}

#[derive(Debug, Args)]
struct PackageArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Emit the packaging report as JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
struct PruneArgs {
    /// Directory to sweep
    #[arg(value_hint = ValueHint::DirPath)]
    root: PathBuf,

    /// Emit the prune report as JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

/// Parse CLI args and execute the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);

    match cli.command {
        Command::App(args) => run_app(args),
        Command::Package(args) => run_package(args),
        Command::PruneLicenses(args) => run_prune(args, remove_license_files),
        Command::PruneDeps(args) => run_prune(args, prune_dependency_tree),
    }
}

fn run_app(args: AppArgs) -> Result<()> {
    let project_dir = resolve_project_dir(
        args.project.project_dir.as_deref(),
        env::var_os(PROJECT_DIR_ENV),
    )?;
    let mut config = load_config(args.project.config.as_deref())?.app;
    if args.skip_prune {
        config.prune_licenses = false;
        config.prune_dependencies = false;
    }

    let machine_output = args.json || args.ndjson;
    let runner = ShellRunner::new().echo(if machine_output {
        Echo::Stderr
    } else {
        Echo::Stdout
    });
    let pipeline = AppPipeline::new(&config, &project_dir, &runner, &RealFileSystem);

    let (report, result) = match pipeline.run() {
        Ok(report) => (report, Ok(())),
        Err(failure) => {
            let report = failure.report.clone();
            (report, Err(anyhow::Error::new(failure)))
        }
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.ndjson {
        write_ndjson(&report, &mut handle)?;
    } else if args.json {
        write_json_pretty(&report, &mut handle)?;
    } else if result.is_ok() {
        write_app_summary(&report, &mut handle)?;
    }

    result
}

fn run_package(args: PackageArgs) -> Result<()> {
    let project_dir = resolve_project_dir(
        args.project.project_dir.as_deref(),
        env::var_os(PROJECT_DIR_ENV),
    )?;
    let config = load_config(args.project.config.as_deref())?.package;

    let runner = ShellRunner::new().echo(if args.json {
        Echo::Stderr
    } else {
        Echo::Stdout
    });
    let report = Packager::new(&config, &project_dir, &runner, &RealFileSystem).run()?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        write_json_pretty(&report, &mut handle)?;
    } else {
        write_package_summary(&report, &mut handle)?;
    }
    Ok(())
}

fn run_prune(args: PruneArgs, sweep: fn(&Path) -> PruneReport) -> Result<()> {
    if !args.root.is_dir() {
        return Err(anyhow!(
            "prune root does not exist: {}",
            args.root.display()
        ));
    }

    let report = sweep(&args.root);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        write_json_pretty(&report, &mut handle)?;
    } else {
        write_prune_summary(&report, &mut handle)?;
    }
    Ok(())
}

fn resolve_project_dir(explicit: Option<&Path>, from_env: Option<OsString>) -> Result<PathBuf> {
    let dir = match (explicit, from_env) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(raw)) if !raw.is_empty() => PathBuf::from(raw),
        _ => env::current_dir().context("cannot determine the current directory")?,
    };

    if !dir.is_dir() {
        return Err(anyhow!("project directory does not exist: {}", dir.display()));
    }
    Ok(dir)
}

fn load_config(path: Option<&Path>) -> Result<DistkitConfig> {
    match path {
        Some(path) => Ok(DistkitConfig::load(path)?),
        None => Ok(DistkitConfig::default()),
    }
}

fn write_app_summary(report: &RunReport, mut w: impl Write) -> Result<()> {
    writeln!(w, "build finished")?;
    if report.artifacts.is_empty() {
        writeln!(w, "no installers found")?;
    }
    for artifact in &report.artifacts {
        writeln!(w, "installer: {}", artifact.display())?;
    }
    Ok(())
}

fn write_package_summary(report: &PackageReport, mut w: impl Write) -> Result<()> {
    writeln!(w, "executable: {}", report.executable.display())?;
    if report.work_dir_removed {
        writeln!(w, "work directory removed")?;
    }
    Ok(())
}

fn write_prune_summary(report: &PruneReport, mut w: impl Write) -> Result<()> {
    for path in &report.removed {
        writeln!(w, "removed: {}", path.display())?;
    }
    for failure in &report.failed {
        writeln!(w, "failed: {} ({})", failure.path.display(), failure.reason)?;
    }
    Ok(())
}
