// crates/acr-probe-core/src/report.rs
// ============================================================================
// Module: Scenario Report
// Description: Step records, assertion results, and the final run report.
// Purpose: Carry per-check pass/fail results without letting one gate another.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A scenario run produces one [`StepRecord`] per orchestration step and, when
//! it reaches the end, a [`ScenarioReport`] with three independent
//! [`AssertionResult`]s. Failing assertions are converted into an
//! [`AssertionFailure`] only on request so every check is always evaluated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Display;

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Steps
// ============================================================================

/// Orchestration steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Provision cloud resources.
    Provision,
    /// Read provisioning outputs.
    ReadOutputs,
    /// Fetch a management-API bearer token.
    FetchToken,
    /// Read the registry configuration.
    ReadRegistryConfig,
    /// Tag the source image with the registry reference.
    ComputeTaggedRef,
    /// Authenticate the container CLI against the registry.
    Login,
    /// Push the tagged image.
    Push,
    /// Remove every locally cached image.
    DeleteLocal,
    /// Pull the tagged image back.
    Pull,
    /// Evaluate the assertions.
    AssertAll,
    /// Destroy provisioned resources.
    Destroy,
}

impl ScenarioStep {
    /// Returns a stable label for the step.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::ReadOutputs => "read_outputs",
            Self::FetchToken => "fetch_token",
            Self::ReadRegistryConfig => "read_registry_config",
            Self::ComputeTaggedRef => "compute_tagged_ref",
            Self::Login => "login",
            Self::Push => "push",
            Self::DeleteLocal => "delete_local",
            Self::Pull => "pull",
            Self::AssertAll => "assert_all",
            Self::Destroy => "destroy",
        }
    }
}

/// Outcome classification for a step or command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Step succeeded.
    Ok,
    /// Step failed but the run continued.
    Degraded,
    /// Step failed and ended the run.
    Failed,
}

impl StepOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
        }
    }
}

/// Record of one finished step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Step that finished.
    pub step: ScenarioStep,
    /// How it finished.
    pub outcome: StepOutcome,
    /// Optional diagnostic text.
    pub message: Option<String>,
}

// ============================================================================
// SECTION: Assertions
// ============================================================================

/// One named expected-versus-actual comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionResult {
    /// Check name as reported to the user.
    pub name: String,
    /// Expected value, rendered as text.
    pub expected: String,
    /// Observed value, rendered as text.
    pub actual: String,
    /// Whether the values matched.
    pub passed: bool,
}

impl AssertionResult {
    /// Compares two values for equality and records the result.
    #[must_use]
    pub fn equal<T: PartialEq + Display + ?Sized>(
        name: impl Into<String>,
        expected: &T,
        actual: &T,
    ) -> Self {
        Self {
            name: name.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            passed: expected == actual,
        }
    }
}

/// Error listing every failed assertion of a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} assertion(s) failed: {}", .failed.len(), describe(.failed))]
pub struct AssertionFailure {
    /// The failed checks.
    pub failed: Vec<AssertionResult>,
}

/// Renders failed checks as `name (expected X, got Y)` joined by `; `.
fn describe(failed: &[AssertionResult]) -> String {
    failed
        .iter()
        .map(|check| format!("{} (expected {}, got {})", check.name, check.expected, check.actual))
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Result of a scenario that reached the assertion stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Registry name read from provisioning outputs.
    pub registry_name: String,
    /// Fully qualified image reference that was pushed and pulled.
    pub image_reference: String,
    /// Observed network-access mode (or a sentinel string).
    pub public_network_access: String,
    /// Whether the push succeeded.
    pub pushed: bool,
    /// Whether the pull succeeded.
    pub pulled: bool,
    /// Independent assertion results, in evaluation order.
    pub checks: Vec<AssertionResult>,
}

impl ScenarioReport {
    /// Returns true when every assertion passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    /// Returns the failed assertions.
    #[must_use]
    pub fn failures(&self) -> Vec<&AssertionResult> {
        self.checks.iter().filter(|check| !check.passed).collect()
    }

    /// Converts failing assertions into an error.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionFailure`] naming every failed check.
    pub fn ensure_passed(&self) -> Result<(), AssertionFailure> {
        let failed: Vec<AssertionResult> = self.failures().into_iter().cloned().collect();
        if failed.is_empty() {
            return Ok(());
        }
        Err(AssertionFailure {
            failed,
        })
    }
}

// ============================================================================
// SECTION: Cleanup
// ============================================================================

/// What happened to the provisioned resources at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum CleanupStatus {
    /// Resources were destroyed.
    Destroyed,
    /// Destroy was skipped on request.
    Retained,
    /// Destroy was attempted and failed.
    Failed(String),
}
