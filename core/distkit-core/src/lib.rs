//! distkit-core: build orchestration for packaged desktop apps
//!
//! Wraps third-party build tools (npm + a bundler/packager toolchain, or a
//! single-executable packager) in a short, strictly sequential run that
//! leaves a clean distributable behind.
//!
//! ## Two flows
//!
//! **App build** ([`pipeline::AppPipeline`]): kill stale app processes,
//! remove previous output directories, check required project files, check
//! the toolchain, clear the package cache, reinstall dependencies, build,
//! prune the outputs and list the produced installers. Fatal stages stop
//! the run at the first failure; best-effort stages only log.
//!
//! **Executable packaging** ([`package::Packager`]): run the packaging tool
//! over one input script and drop its work directory afterwards.
//!
//! ## Pruning
//!
//! [`prune`] deletes license files from output trees and trims dependency
//! trees with a keep list that always wins over the remove list.
//!
//! ```rust,no_run
//! use distkit_core::config::AppBuildConfig;
//! use distkit_core::fs::RealFileSystem;
//! use distkit_core::pipeline::AppPipeline;
//! use distkit_core::runner::ShellRunner;
//!
//! let config = AppBuildConfig::default();
//! let runner = ShellRunner::new();
//! let pipeline = AppPipeline::new(&config, "/path/to/app", &runner, &RealFileSystem);
//!
//! match pipeline.run() {
//!     Ok(report) => {
//!         for installer in &report.artifacts {
//!             println!("installer: {}", installer.display());
//!         }
//!     }
//!     Err(failure) => eprintln!("error: {failure}"),
//! }
//! ```
//!
//! Everything runs on the calling thread, one external process at a time.

pub mod clean;
pub mod config;
pub mod error;
pub mod fs;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod prereq;
pub mod process;
pub mod prune;
pub mod runner;
