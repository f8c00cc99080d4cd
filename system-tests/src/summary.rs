// system-tests/src/summary.rs
// ============================================================================
// Module: Run Summary
// Description: Serializable outcome of one live scenario run.
// Purpose: Turn a `ScenarioRun` into `summary.json` and `summary.md` content.
// Dependencies: acr-probe-core, serde
// ============================================================================

//! ## Overview
//! [`RunSummary`] carries the per-check assertion results, the step records,
//! the step that ended the run early (if any), and the cleanup status. The
//! status collapses those into one verdict, with cleanup failure taking
//! precedence over everything else.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use acr_probe_core::AssertionResult;
use acr_probe_core::CleanupStatus;
use acr_probe_core::ScenarioRun;
use acr_probe_core::ScenarioStep;
use acr_probe_core::StepRecord;
use serde::Serialize;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Verdict of a live run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    /// Every assertion passed and resources were cleaned up.
    Pass,
    /// The run reached the assertions and at least one failed.
    AssertionsFailed,
    /// A fatal step ended the run early.
    Error,
    /// Destroy failed; resources may have leaked.
    CleanupFailed,
    /// Preconditions were missing, nothing was provisioned.
    Skipped,
    /// The test ended without recording a summary.
    Interrupted,
}

impl SummaryStatus {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::AssertionsFailed => "assertions_failed",
            Self::Error => "error",
            Self::CleanupFailed => "cleanup_failed",
            Self::Skipped => "skipped",
            Self::Interrupted => "interrupted",
        }
    }
}

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Outcome of one live test, written as `summary.json` and `summary.md`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Test name.
    pub test_name: String,
    /// Overall verdict.
    pub status: SummaryStatus,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u128,
    /// Registry under test, when the run reached the assertions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_name: Option<String>,
    /// Pushed and pulled image, when the run reached the assertions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<String>,
    /// Assertion results, in evaluation order.
    pub checks: Vec<AssertionResult>,
    /// Finished steps, in order.
    pub steps: Vec<StepRecord>,
    /// Step that ended the run early.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<ScenarioStep>,
    /// Fatal error text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Cleanup result, when cleanup ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupStatus>,
    /// Free-form notes.
    pub notes: Vec<String>,
}

impl RunSummary {
    /// Summarizes a finished scenario run.
    #[must_use]
    pub fn from_run(test_name: &str, run: &ScenarioRun) -> Self {
        let mut summary = Self::empty(test_name, SummaryStatus::Pass);
        summary.steps.clone_from(&run.steps);
        summary.cleanup = Some(run.cleanup.clone());
        match &run.outcome {
            Ok(report) => {
                summary.registry_name = Some(report.registry_name.clone());
                summary.image_reference = Some(report.image_reference.clone());
                summary.checks.clone_from(&report.checks);
                if !report.all_passed() {
                    summary.status = SummaryStatus::AssertionsFailed;
                }
            }
            Err(err) => {
                summary.status = SummaryStatus::Error;
                summary.failed_step = Some(err.step());
                summary.error = Some(err.to_string());
            }
        }
        if matches!(run.cleanup, CleanupStatus::Failed(_)) {
            summary.status = SummaryStatus::CleanupFailed;
        }
        summary
    }

    /// Summarizes a run skipped before provisioning.
    #[must_use]
    pub fn skipped(test_name: &str, reason: impl Into<String>) -> Self {
        let mut summary = Self::empty(test_name, SummaryStatus::Skipped);
        summary.notes.push(reason.into());
        summary
    }

    /// Summarizes a test that ended without recording a result.
    #[must_use]
    pub fn interrupted(test_name: &str, panicking: bool) -> Self {
        let mut summary = Self::empty(test_name, SummaryStatus::Interrupted);
        let note = if panicking { "test panicked" } else { "test ended without a summary" };
        summary.notes.push(note.to_string());
        summary
    }

    /// Sets the measured duration.
    #[must_use]
    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Returns a failure description, or `None` for passing and skipped runs.
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        match self.status {
            SummaryStatus::Pass | SummaryStatus::Skipped => None,
            SummaryStatus::AssertionsFailed => {
                let failed: Vec<&str> = self
                    .checks
                    .iter()
                    .filter(|check| !check.passed)
                    .map(|check| check.name.as_str())
                    .collect();
                Some(format!("assertions failed: {}", failed.join("; ")))
            }
            SummaryStatus::Error => Some(format!(
                "{} failed: {}",
                self.failed_step.map_or("run", ScenarioStep::as_str),
                self.error.as_deref().unwrap_or("unknown error")
            )),
            SummaryStatus::CleanupFailed => Some(format!(
                "destroy failed: {}",
                self.cleanup.as_ref().map_or("", cleanup_message)
            )),
            SummaryStatus::Interrupted => Some(self.notes.join("; ")),
        }
    }

    /// Renders the markdown summary with one line per check.
    #[must_use]
    pub fn render_markdown(&self) -> String {
        let mut out = String::from("# System-Test Summary\n\n");
        let _ = writeln!(out, "- Test: {}", self.test_name);
        let _ = writeln!(out, "- Status: {}", self.status.as_str());
        let _ = writeln!(out, "- Duration (ms): {}", self.duration_ms);
        if let Some(registry) = &self.registry_name {
            let _ = writeln!(out, "- Registry: {registry}");
        }
        if let Some(image) = &self.image_reference {
            let _ = writeln!(out, "- Image: {image}");
        }
        if let Some(cleanup) = &self.cleanup {
            let _ = writeln!(out, "- Cleanup: {}", cleanup_line(cleanup));
        }

        out.push_str("\n## Checks\n\n");
        if self.checks.is_empty() {
            out.push_str("- None\n");
        }
        for check in &self.checks {
            if check.passed {
                let _ = writeln!(out, "- PASS {}", check.name);
            } else {
                let _ = writeln!(
                    out,
                    "- FAIL {} (expected {}, got {})",
                    check.name, check.expected, check.actual
                );
            }
        }

        out.push_str("\n## Steps\n\n");
        if self.steps.is_empty() {
            out.push_str("- None\n");
        }
        for record in &self.steps {
            let _ = write!(out, "- {}: {}", record.step.as_str(), record.outcome.as_str());
            if let Some(message) = &record.message {
                let _ = write!(out, " ({message})");
            }
            out.push('\n');
        }

        if let (Some(step), Some(error)) = (self.failed_step, &self.error) {
            let _ = write!(out, "\n## Failure\n\n- {}: {error}\n", step.as_str());
        }
        if !self.notes.is_empty() {
            out.push_str("\n## Notes\n\n");
            for note in &self.notes {
                let _ = writeln!(out, "- {note}");
            }
        }
        out
    }

    /// Builds a summary with no run data.
    fn empty(test_name: &str, status: SummaryStatus) -> Self {
        Self {
            test_name: test_name.to_string(),
            status,
            duration_ms: 0,
            registry_name: None,
            image_reference: None,
            checks: Vec::new(),
            steps: Vec::new(),
            failed_step: None,
            error: None,
            cleanup: None,
            notes: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a cleanup status for markdown.
fn cleanup_line(status: &CleanupStatus) -> String {
    match status {
        CleanupStatus::Destroyed => "destroyed".to_string(),
        CleanupStatus::Retained => "retained".to_string(),
        CleanupStatus::Failed(message) => format!("destroy failed: {message}"),
    }
}

/// Returns the failure text of a cleanup status, empty otherwise.
fn cleanup_message(status: &CleanupStatus) -> &str {
    match status {
        CleanupStatus::Failed(message) => message.as_str(),
        CleanupStatus::Destroyed | CleanupStatus::Retained => "",
    }
}
