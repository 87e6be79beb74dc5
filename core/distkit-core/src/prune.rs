//! Post-build pruning of license files and dependency-tree clutter
//!
//! Two sweeps share one deletion routine:
//!
//! - [`remove_license_files`] walks an output tree and deletes every entry
//!   whose name matches [`LICENSE_PATTERNS`], at any depth.
//! - [`prune_dependency_tree`] expands [`DEPENDENCY_KEEP_PATTERNS`] first,
//!   then deletes matches of [`DEPENDENCY_REMOVE_PATTERNS`] that the keep
//!   pass did not claim.
//!
//! Both are best-effort: they return a [`PruneReport`] and never fail.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Entry names removed from generated output trees.
pub const LICENSE_PATTERNS: &[&str] = &[
    "LICENSE.chromium*",
    "LICENSE.electron*",
    "LICENSES.chromium*",
    "LICENSE.txt",
    "LICENSE",
    "license.txt",
    "*.licenses",
    "license",
    "LICENCE*",
];

/// Paths under the dependency root that always survive pruning.
pub const DEPENDENCY_KEEP_PATTERNS: &[&str] = &[
    "*/package.json",
    "*/index.js",
    "*/lib/*",
    "*/dist/*",
    "*/build/*",
    "*/bin/*",
    "*/conf/*",
    "*/config/*",
    "*/src/*",
];

/// Paths under the dependency root that are not needed at runtime.
pub const DEPENDENCY_REMOVE_PATTERNS: &[&str] = &[
    "*/.github/*",
    "*/docs/*",
    "*/.idea/*",
    "*/.vscode/*",
    "*/typescript/*",
    "*/.git/*",
    "*/benchmark/*",
    "*/coverage/*",
    "*/LICENSE*",
    "*/LICENCE*",
    "*/license*",
    "*/README*",
    "*/test/*",
    "*/tests/*",
    "*/example/*",
    "*/examples/*",
];

/// Shell-style matching: case-sensitive, `*` stays inside one component and
/// never matches a leading dot.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// What a sweep deleted and what it could not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PruneFailure>,
}

impl PruneReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, path: &Path, result: io::Result<bool>) {
        match result {
            Ok(true) => self.removed.push(path.to_path_buf()),
            Ok(false) => {}
            Err(err) => self.failed.push(PruneFailure {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }),
        }
    }
}

/// True when `name` matches one of [`LICENSE_PATTERNS`].
pub fn matches_license_name(name: &str) -> bool {
    compile(LICENSE_PATTERNS)
        .iter()
        .any(|p| name_matches(p, name))
}

/// Hidden names only match patterns that spell out the leading dot, so
/// `*.licenses` leaves a bare `.licenses` alone.
fn name_matches(pattern: &Pattern, name: &str) -> bool {
    if name.starts_with('.') && !pattern.as_str().starts_with('.') {
        return false;
    }
    pattern.matches_with(name, MATCH_OPTIONS)
}

/// Delete license files and directories anywhere below `root`.
pub fn remove_license_files(root: &Path) -> PruneReport {
    remove_matching_names(root, LICENSE_PATTERNS)
}

/// Delete every entry below `root` whose file name matches one of `patterns`.
///
/// Hidden directories are not descended into. Each deletion failure is
/// logged and recorded; the sweep always runs to the end.
pub fn remove_matching_names(root: &Path, patterns: &[&str]) -> PruneReport {
    let mut report = PruneReport::default();
    if !root.is_dir() {
        debug!(root = %root.display(), "nothing to prune");
        return report;
    }

    let patterns = compile(patterns);
    let mut walker = WalkDir::new(root).min_depth(1).into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "could not read entry while pruning");
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy();
        let is_dir = entry.file_type().is_dir();

        if patterns.iter().any(|p| name_matches(p, &name)) {
            let result = remove_path(entry.path());
            match &result {
                Ok(true) => info!(path = %entry.path().display(), "removed"),
                Ok(false) => {}
                Err(err) => warn!(path = %entry.path().display(), error = %err, "failed to remove"),
            }
            report.record(entry.path(), result);
            if is_dir {
                walker.skip_current_dir();
            }
        } else if is_dir && name.starts_with('.') {
            walker.skip_current_dir();
        }
    }

    report
}

/// Prune a dependency tree using the built-in keep/remove lists.
pub fn prune_dependency_tree(root: &Path) -> PruneReport {
    prune_with_allow_list(root, DEPENDENCY_KEEP_PATTERNS, DEPENDENCY_REMOVE_PATTERNS)
}

/// Delete matches of `remove` below `root`, except paths matched by `keep`.
///
/// The keep set is computed in full before anything is deleted, so an entry
/// matched by both lists always survives. Deletion failures are recorded in
/// the report and logged at debug level only.
pub fn prune_with_allow_list(root: &Path, keep: &[&str], remove: &[&str]) -> PruneReport {
    let mut report = PruneReport::default();
    if !root.is_dir() {
        debug!(root = %root.display(), "no dependency tree to prune");
        return report;
    }

    let keep_set: HashSet<PathBuf> = keep
        .iter()
        .flat_map(|pattern| expand(root, pattern))
        .collect();
    debug!(kept = keep_set.len(), "computed keep set");

    for pattern in remove {
        for path in expand(root, pattern) {
            if keep_set.contains(&path) {
                continue;
            }
            let result = remove_path(&path);
            if let Err(err) = &result {
                debug!(path = %path.display(), error = %err, "ignoring prune failure");
            }
            report.record(&path, result);
        }
    }

    info!(
        root = %root.display(),
        removed = report.removed.len(),
        "dependency tree pruned"
    );
    report
}

fn compile(patterns: &[&str]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|raw| match Pattern::new(raw) {
            Ok(p) => Some(p),
            Err(err) => {
                warn!(pattern = %raw, error = %err, "skipping invalid pattern");
                None
            }
        })
        .collect()
}

/// List matches of `pattern` relative to `root`, collected up front so
/// deletions cannot disturb the directory iteration.
fn expand(root: &Path, pattern: &str) -> Vec<PathBuf> {
    let base = Pattern::escape(&root.to_string_lossy());
    let full = format!("{base}/{pattern}");

    match glob::glob_with(&full, MATCH_OPTIONS) {
        Ok(paths) => paths.filter_map(Result::ok).collect(),
        Err(err) => {
            warn!(pattern = %pattern, error = %err, "skipping invalid pattern");
            Vec::new()
        }
    }
}

/// Remove a file, symlink or directory tree. `Ok(false)` means it was
/// already gone.
fn remove_path(path: &Path) -> io::Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };

    if meta.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}
