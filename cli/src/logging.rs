//! tracing subscriber setup for the distkit binary

use std::io;

use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// `-v` raises the default level from info to debug, `-vv` to trace.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_directives(verbosity: u8) -> String {
    let level = level_for(verbosity);
    format!("distkit_core={level},distkit_cli={level}")
}

/// Install the global subscriber, writing to stderr so stdout stays free for
/// reports and echoed tool output. Later calls are ignored.
pub fn init(verbosity: u8, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!("logging already initialised");
    }
}
