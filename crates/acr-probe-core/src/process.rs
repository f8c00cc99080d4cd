// crates/acr-probe-core/src/process.rs
// ============================================================================
// Module: Process Runner
// Description: Invocation of external executables with captured output.
// Purpose: Give every external tool call one redaction-aware entry point.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! External tools (the provisioning tool, the identity CLI, the container CLI)
//! are invoked through the [`CommandRunner`] trait. Commands are described by
//! a [`CommandSpec`] whose secret arguments are masked whenever the command
//! line is rendered for logs or error messages.
//!
//! Calls are synchronous and blocking. No timeout is applied beyond what the
//! invoked tool enforces itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::events::NoopEventSink;
use crate::events::ProbeEvent;
use crate::events::ProbeEventSink;
use crate::report::StepOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Replacement text for secret arguments in rendered command lines.
pub const REDACTED: &str = "***";
/// Maximum number of stderr characters carried inside an error message.
const MAX_STDERR_CHARS: usize = 2_048;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while running an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The executable could not be started.
    #[error("failed to start `{command}`: {message}")]
    Spawn {
        /// Redacted command line.
        command: String,
        /// Underlying OS error text.
        message: String,
    },
    /// The command exited unsuccessfully.
    #[error("`{command}` exited with {status}: {stderr}")]
    NonZeroExit {
        /// Redacted command line.
        command: String,
        /// Human-readable exit status.
        status: String,
        /// Trimmed standard error (or standard output when stderr is empty).
        stderr: String,
    },
    /// The command succeeded but printed nothing on standard output.
    #[error("`{command}` produced no output")]
    EmptyOutput {
        /// Redacted command line.
        command: String,
    },
}

// ============================================================================
// SECTION: Command Specification
// ============================================================================

/// One command-line argument.
#[derive(Clone, PartialEq, Eq)]
struct CommandArg {
    /// Literal argument value passed to the process.
    value: String,
    /// Whether the value must be masked when rendered.
    secret: bool,
}

/// Description of an external command invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path.
    program: String,
    /// Ordered arguments.
    args: Vec<CommandArg>,
    /// Optional working directory.
    current_dir: Option<PathBuf>,
}

impl CommandSpec {
    /// Creates a command for the given program with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Appends a plain argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(CommandArg {
            value: value.into(),
            secret: false,
        });
        self
    }

    /// Appends several plain arguments.
    #[must_use]
    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self = self.arg(value);
        }
        self
    }

    /// Appends an argument that is masked in logs and errors.
    #[must_use]
    pub fn secret_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(CommandArg {
            value: value.into(),
            secret: true,
        });
        self
    }

    /// Sets the working directory for the command.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Returns the program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the raw argument values, secrets included.
    #[must_use]
    pub fn arg_values(&self) -> Vec<&str> {
        self.args.iter().map(|arg| arg.value.as_str()).collect()
    }

    /// Returns the working directory, if any.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Renders the command line with secret arguments masked.
    #[must_use]
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.secret {
                line.push_str(REDACTED);
            } else {
                line.push_str(&arg.value);
            }
        }
        line
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.display_line())
            .field("current_dir", &self.current_dir)
            .finish()
    }
}

// ============================================================================
// SECTION: Command Output
// ============================================================================

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Standard output decoded lossily as UTF-8.
    pub stdout: String,
    /// Standard error decoded lossily as UTF-8.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns true when the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Renders the exit status for diagnostics.
    #[must_use]
    pub fn status_label(&self) -> String {
        self.code.map_or_else(|| "signal".to_string(), |code| format!("exit code {code}"))
    }

    /// Returns the most useful diagnostic text, preferring stderr.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        let text = if stderr.is_empty() { self.stdout.trim() } else { stderr };
        text.chars().take(MAX_STDERR_CHARS).collect()
    }
}

// ============================================================================
// SECTION: Runner Trait
// ============================================================================

/// Executes external commands.
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion and captures its output.
    ///
    /// A non-zero exit is not an error at this level; see
    /// [`CommandRunner::run_checked`].
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Spawn`] when the process cannot be started.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError>;

    /// Runs the command and fails on a non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the process cannot be started or exits
    /// unsuccessfully.
    fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        let output = self.run(spec)?;
        if output.success() {
            return Ok(output);
        }
        Err(ProcessError::NonZeroExit {
            command: spec.display_line(),
            status: output.status_label(),
            stderr: output.diagnostic(),
        })
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        (**self).run(spec)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        (**self).run(spec)
    }
}

// ============================================================================
// SECTION: System Runner
// ============================================================================

/// Runner backed by [`std::process::Command`].
///
/// Every finished command is recorded as a `command.finished` event with its
/// redacted command line and exit code.
pub struct SystemCommandRunner {
    /// Event sink for command records.
    events: Arc<dyn ProbeEventSink>,
}

impl SystemCommandRunner {
    /// Creates a runner that does not record events.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(NoopEventSink),
        }
    }

    /// Creates a runner recording each command to the given sink.
    #[must_use]
    pub fn with_events(events: Arc<dyn ProbeEventSink>) -> Self {
        Self {
            events,
        }
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        let mut command = Command::new(spec.program());
        command.args(spec.arg_values());
        if let Some(dir) = spec.working_dir() {
            command.current_dir(dir);
        }
        let started = Instant::now();
        let raw = command.output().map_err(|err| {
            self.events.record(
                &ProbeEvent::new("command.spawn_failed")
                    .outcome(StepOutcome::Failed)
                    .command(spec.display_line())
                    .message(err.to_string()),
            );
            ProcessError::Spawn {
                command: spec.display_line(),
                message: err.to_string(),
            }
        })?;
        let output = CommandOutput {
            code: raw.status.code(),
            stdout: String::from_utf8_lossy(&raw.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&raw.stderr).into_owned(),
        };
        let outcome = if output.success() { StepOutcome::Ok } else { StepOutcome::Failed };
        let mut event = ProbeEvent::new("command.finished")
            .outcome(outcome)
            .command(spec.display_line())
            .duration_ms(started.elapsed().as_millis());
        if let Some(code) = output.code {
            event = event.exit_code(code);
        }
        self.events.record(&event);
        Ok(output)
    }
}
