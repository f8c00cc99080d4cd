// crates/acr-probe-core/src/events.rs
// ============================================================================
// Module: Probe Event Log
// Description: Structured JSON-lines events for steps and external commands.
// Purpose: Emit run diagnostics without coupling to a logging backend.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every orchestration step, every external command, and the cleanup result
//! are recorded as a [`ProbeEvent`]. Sinks serialize events as one JSON object
//! per line. Recording never fails the run: serialization or write errors are
//! dropped.
//!
//! Events must never carry secrets. Command lines are rendered through
//! [`crate::process::CommandSpec::display_line`], which masks secret
//! arguments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::report::ScenarioStep;
use crate::report::StepOutcome;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One structured log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeEvent {
    /// Event identifier, e.g. `step.finished` or `command.finished`.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Orchestration step, when the event belongs to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<ScenarioStep>,
    /// Outcome, when the event reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<StepOutcome>,
    /// Free-form diagnostic message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Redacted command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Process exit code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Elapsed wall-clock time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

impl ProbeEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event: &'static str) -> Self {
        Self {
            event,
            timestamp_ms: now_millis(),
            step: None,
            outcome: None,
            message: None,
            command: None,
            exit_code: None,
            duration_ms: None,
        }
    }

    /// Attaches the orchestration step.
    #[must_use]
    pub const fn step(mut self, step: ScenarioStep) -> Self {
        self.step = Some(step);
        self
    }

    /// Attaches an outcome.
    #[must_use]
    pub const fn outcome(mut self, outcome: StepOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Attaches a diagnostic message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches a redacted command line.
    #[must_use]
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attaches a process exit code.
    #[must_use]
    pub const fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Attaches an elapsed duration.
    #[must_use]
    pub const fn duration_ms(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Returns the current time in milliseconds since the Unix epoch.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Destination for probe events.
pub trait ProbeEventSink: Send + Sync {
    /// Records an event. Implementations must not panic.
    fn record(&self, event: &ProbeEvent);
}

/// Sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl ProbeEventSink for StderrEventSink {
    fn record(&self, event: &ProbeEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the log file in append mode, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ProbeEventSink for FileEventSink {
    fn record(&self, event: &ProbeEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op sink.
pub struct NoopEventSink;

impl ProbeEventSink for NoopEventSink {
    fn record(&self, _event: &ProbeEvent) {}
}
