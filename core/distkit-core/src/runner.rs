//! Synchronous command execution with captured output

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Output};

use tracing::{debug, info, warn};

/// Something to execute: either a shell command line or a program with an
/// explicit argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Shell(String),
    Program { program: String, args: Vec<OsString> },
}

impl Invocation {
    pub fn shell(line: impl Into<String>) -> Self {
        Invocation::Shell(line.into())
    }

    pub fn program<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Invocation::Program {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn to_command(&self) -> Command {
        match self {
            Invocation::Shell(line) => {
                let mut cmd = if cfg!(windows) {
                    let mut cmd = Command::new("cmd");
                    cmd.arg("/C");
                    cmd
                } else {
                    let mut cmd = Command::new("sh");
                    cmd.arg("-c");
                    cmd
                };
                cmd.arg(line);
                cmd
            }
            Invocation::Program { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Shell(line) => f.write_str(line),
            Invocation::Program { program, args } => {
                f.write_str(program)?;
                for arg in args {
                    write!(f, " {}", arg.to_string_lossy())?;
                }
                Ok(())
            }
        }
    }
}

/// Result of one command. `success` is true only for a zero exit status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// The process never started (missing executable, bad working dir, ...).
    pub fn spawn_failed(err: &io::Error) -> Self {
        Self {
            success: false,
            code: None,
            stdout: String::new(),
            stderr: format!("failed to start command: {err}"),
        }
    }
}

impl From<Output> for CommandOutcome {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Executes invocations to completion. Implementations never return an
/// error: anything that goes wrong shows up as an unsuccessful outcome.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation, cwd: Option<&Path>) -> CommandOutcome;
}

/// Where a [`ShellRunner`] copies captured command output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Echo {
    #[default]
    Stdout,
    /// Keeps stdout free for machine-readable reports.
    Stderr,
    Off,
}

/// Runs commands on the host, blocking until they exit, and echoes the
/// captured output.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    echo: Echo,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn echo(mut self, echo: Echo) -> Self {
        self.echo = echo;
        self
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, invocation: &Invocation, cwd: Option<&Path>) -> CommandOutcome {
        info!(command = %invocation, "running command");

        let mut cmd = invocation.to_command();
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let outcome = match cmd.output() {
            Ok(output) => CommandOutcome::from(output),
            Err(err) => {
                warn!(command = %invocation, error = %err, "command could not be started");
                CommandOutcome::spawn_failed(&err)
            }
        };

        debug!(command = %invocation, code = ?outcome.code, success = outcome.success, "command finished");

        let echoed = match self.echo {
            Echo::Stdout => echo_outcome(&outcome, io::stdout().lock()),
            Echo::Stderr => echo_outcome(&outcome, io::stderr().lock()),
            Echo::Off => Ok(()),
        };
        if let Err(err) = echoed {
            debug!(error = %err, "could not echo command output");
        }

        outcome
    }
}

/// Write captured stdout, then stderr under its own heading.
pub fn echo_outcome(outcome: &CommandOutcome, mut w: impl Write) -> io::Result<()> {
    if !outcome.stdout.is_empty() {
        writeln!(w, "{}", outcome.stdout.trim_end())?;
    }
    if !outcome.stderr.is_empty() {
        writeln!(w, "stderr:")?;
        writeln!(w, "{}", outcome.stderr.trim_end())?;
    }
    Ok(())
}
