use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use distkit_core::config::AppBuildConfig;
use distkit_core::error::BuildError;
use distkit_core::fs::{FileSystem, RealFileSystem};
use distkit_core::pipeline::{AppPipeline, Stage, StageOutcome};
use distkit_core::process::kill_invocation;
use distkit_core::runner::{CommandOutcome, CommandRunner, Invocation};
use tempfile::TempDir;

/// Records every invocation; fails the listed command lines and creates
/// files as a side effect of others.
#[derive(Default)]
struct ScriptedRunner {
    calls: RefCell<Vec<String>>,
    failing: Vec<String>,
    creates: Vec<(String, PathBuf)>,
}

impl ScriptedRunner {
    fn failing(mut self, line: &str) -> Self {
        self.failing.push(line.to_string());
        self
    }

    fn creating(mut self, line: &str, path: PathBuf) -> Self {
        self.creates.push((line.to_string(), path));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation, _cwd: Option<&Path>) -> CommandOutcome {
        let line = invocation.to_string();
        self.calls.borrow_mut().push(line.clone());

        if self.failing.contains(&line) {
            return CommandOutcome::failed(1, "", "simulated failure");
        }
        for (trigger, path) in &self.creates {
            if *trigger == line {
                fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
                fs::write(path, b"artifact").expect("write");
            }
        }
        CommandOutcome::succeeded("ok")
    }
}

/// Refuses to remove one directory, like a folder held open by an editor.
struct LockedFs {
    locked: PathBuf,
}

impl FileSystem for LockedFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        if path == self.locked {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "being used by another process",
            ))
        } else {
            fs::remove_dir_all(path)
        }
    }
}

fn app_project() -> TempDir {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    fs::create_dir_all(root.join("electron")).expect("mkdir electron");
    fs::write(root.join("package.json"), br#"{"name":"antnote"}"#).expect("package.json");
    fs::write(root.join("vite.config.ts"), b"export default {}").expect("vite config");
    fs::write(root.join("electron/main.ts"), b"// main").expect("main.ts");
    tmp
}

fn kill_lines(config: &AppBuildConfig) -> Vec<String> {
    config
        .stale_processes
        .iter()
        .map(|image| kill_invocation(image).to_string())
        .collect()
}

#[test]
fn succeeds_when_every_command_succeeds() {
    let project = app_project();
    let config = AppBuildConfig::default();
    let runner = ScriptedRunner::default();

    let report = AppPipeline::new(&config, project.path(), &runner, &RealFileSystem)
        .run()
        .expect("pipeline succeeds");

    let mut expected = kill_lines(&config);
    expected.extend(
        [
            "node --version",
            "npm cache clean --force",
            "npm install",
            "npm run build",
        ]
        .map(String::from),
    );
    assert_eq!(runner.calls(), expected);

    let stages: Vec<Stage> = report.stages.iter().map(|r| r.stage).collect();
    assert_eq!(stages, Stage::ALL.to_vec());
    assert!(report
        .stages
        .iter()
        .all(|r| r.outcome == StageOutcome::Passed));
}

#[test]
fn locked_output_dir_stops_the_run() {
    let project = app_project();
    let dist = project.path().join("dist");
    fs::create_dir_all(&dist).expect("mkdir dist");

    let config = AppBuildConfig::default();
    let runner = ScriptedRunner::default();
    let fs = LockedFs {
        locked: dist.clone(),
    };

    let failure = AppPipeline::new(&config, project.path(), &runner, &fs)
        .run()
        .expect_err("locked dist must abort");

    assert_eq!(failure.stage, Stage::CleanOutputs);
    assert!(matches!(
        failure.source,
        BuildError::OutputDirLocked { ref path, .. } if *path == dist
    ));
    assert_eq!(failure.report.stages.len(), 2);
    assert_eq!(runner.calls(), kill_lines(&config));
    assert!(failure.report.prerequisites.is_empty());
}

#[test]
fn install_failure_never_reaches_build() {
    let project = app_project();
    let config = AppBuildConfig::default();
    let runner = ScriptedRunner::default().failing("npm install");

    let failure = AppPipeline::new(&config, project.path(), &runner, &RealFileSystem)
        .run()
        .expect_err("install failure is fatal");

    assert_eq!(failure.stage, Stage::InstallDependencies);
    assert!(!runner.calls().iter().any(|c| c == "npm run build"));
    assert_eq!(
        failure.report.outcome(Stage::InstallDependencies),
        Some(&StageOutcome::Failed {
            reason: "dependency install failed: `npm install` exited unsuccessfully".to_string()
        })
    );
}

#[test]
fn missing_toolchain_is_fatal() {
    let project = app_project();
    let config = AppBuildConfig::default();
    let runner = ScriptedRunner::default().failing("node --version");

    let failure = AppPipeline::new(&config, project.path(), &runner, &RealFileSystem)
        .run()
        .expect_err("toolchain missing");

    assert!(matches!(
        failure.source,
        BuildError::ToolchainUnavailable { .. }
    ));
    assert!(!runner.calls().iter().any(|c| c.starts_with("npm")));
}

#[test]
fn missing_prerequisites_are_enumerated() {
    let project = app_project();
    fs::remove_file(project.path().join("vite.config.ts")).expect("rm");

    let config = AppBuildConfig::default();
    let runner = ScriptedRunner::default();

    let failure = AppPipeline::new(&config, project.path(), &runner, &RealFileSystem)
        .run()
        .expect_err("missing vite config");

    assert_eq!(failure.stage, Stage::CheckPrerequisites);
    match &failure.source {
        BuildError::MissingPrerequisites { missing } => {
            assert_eq!(missing, &vec![PathBuf::from("vite.config.ts")])
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(runner.calls(), kill_lines(&config));
}

#[test]
fn cache_clear_failure_only_degrades() {
    let project = app_project();
    let config = AppBuildConfig::default();
    let runner = ScriptedRunner::default().failing("npm cache clean --force");

    let report = AppPipeline::new(&config, project.path(), &runner, &RealFileSystem)
        .run()
        .expect("cache failure is not fatal");

    assert!(matches!(
        report.outcome(Stage::ClearCache),
        Some(StageOutcome::Degraded { .. })
    ));
    assert!(runner.calls().iter().any(|c| c == "npm run build"));
}

#[test]
fn previous_outputs_and_dependencies_are_replaced() {
    let project = app_project();
    let root = project.path();
    fs::create_dir_all(root.join("dist-electron")).expect("mkdir");
    fs::write(root.join("dist-electron/main.js"), b"old").expect("old output");
    fs::create_dir_all(root.join("node_modules/left-pad")).expect("mkdir");
    fs::write(root.join("node_modules/stale.txt"), b"old").expect("stale dep");

    let config = AppBuildConfig::default();
    let runner = ScriptedRunner::default().creating(
        "npm install",
        root.join("node_modules/left-pad/package.json"),
    );

    AppPipeline::new(&config, root, &runner, &RealFileSystem)
        .run()
        .expect("pipeline succeeds");

    assert!(!root.join("dist-electron").exists());
    assert!(!root.join("node_modules/stale.txt").exists());
    assert!(root.join("node_modules/left-pad/package.json").exists());
}

#[test]
fn build_outputs_are_pruned_and_installers_listed() {
    let project = app_project();
    let root = project.path();
    let installer = root.join("dist/AntNote Setup 1.0.0.exe");
    let license = root.join("dist/win-unpacked/LICENSE.electron.txt");
    let readme = root.join("node_modules/left-pad/README.md");
    let manifest = root.join("node_modules/left-pad/package.json");

    let config = AppBuildConfig::default();
    let runner = ScriptedRunner::default()
        .creating("npm install", readme.clone())
        .creating("npm install", manifest.clone())
        .creating("npm run build", installer.clone())
        .creating("npm run build", license.clone())
        .creating("npm run build", root.join("dist/latest.yml"));

    let report = AppPipeline::new(&config, root, &runner, &RealFileSystem)
        .run()
        .expect("pipeline succeeds");

    assert_eq!(report.artifacts, vec![installer.clone()]);
    assert!(installer.exists());
    assert!(!license.exists());
    assert!(!readme.exists());
    assert!(manifest.exists());

    let licenses = report.license_prune.expect("license sweep ran");
    assert_eq!(licenses.removed, vec![license]);
    let deps = report.dependency_prune.expect("dependency sweep ran");
    assert_eq!(deps.removed, vec![readme]);
}

#[test]
fn pruning_can_be_switched_off() {
    let project = app_project();
    let config = AppBuildConfig {
        prune_licenses: false,
        prune_dependencies: false,
        ..AppBuildConfig::default()
    };
    let runner = ScriptedRunner::default();

    let report = AppPipeline::new(&config, project.path(), &runner, &RealFileSystem)
        .run()
        .expect("pipeline succeeds");

    assert_eq!(
        report.outcome(Stage::PruneOutputs),
        Some(&StageOutcome::Skipped)
    );
    assert!(report.license_prune.is_none());
    assert!(report.dependency_prune.is_none());
}
