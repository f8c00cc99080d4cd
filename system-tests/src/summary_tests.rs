// system-tests/src/summary_tests.rs
// ============================================================================
// Module: Run Summary Unit Tests
// Description: Unit coverage for run summaries.
// Purpose: Ensure summaries carry checks, failing steps, and cleanup results.
// Dependencies: acr-probe-core, serde_json
// ============================================================================

//! ## Overview
//! Builds [`ScenarioRun`] values by hand and checks the summary status, the
//! JSON shape, and the rendered markdown.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use acr_probe_core::AssertionResult;
use acr_probe_core::CleanupStatus;
use acr_probe_core::ScenarioError;
use acr_probe_core::ScenarioReport;
use acr_probe_core::ScenarioRun;
use acr_probe_core::ScenarioStep;
use acr_probe_core::StepOutcome;
use acr_probe_core::StepRecord;
use serde_json::json;

use crate::summary::RunSummary;
use crate::summary::SummaryStatus;

/// Image reference used by the fixtures.
const IMAGE: &str = "probe.azurecr.io/hello-world:1.0.1";

/// Builds a run that reached the assertions.
fn finished_run(pushed: bool, cleanup: CleanupStatus) -> ScenarioRun {
    let checks = vec![
        AssertionResult::equal("Checking the Access for this ACR: probe", "Disabled", "Disabled"),
        AssertionResult::equal(
            format!("Validate the images pushed to ACR : {IMAGE}"),
            &true,
            &pushed,
        ),
        AssertionResult::equal(
            format!("Validate the pulled images from ACR : {IMAGE}"),
            &true,
            &true,
        ),
    ];
    ScenarioRun {
        steps: vec![StepRecord {
            step: ScenarioStep::Push,
            outcome: if pushed { StepOutcome::Ok } else { StepOutcome::Degraded },
            message: (!pushed).then(|| "denied".to_string()),
        }],
        outcome: Ok(ScenarioReport {
            registry_name: "probe".to_string(),
            image_reference: IMAGE.to_string(),
            public_network_access: "Disabled".to_string(),
            pushed,
            pulled: true,
            checks,
        }),
        cleanup,
    }
}

/// Tests that a passing run carries its checks and cleanup.
#[test]
fn passing_run_carries_checks_and_cleanup() {
    let summary = RunSummary::from_run("live", &finished_run(true, CleanupStatus::Destroyed));

    assert_eq!(summary.status, SummaryStatus::Pass);
    assert_eq!(summary.checks.len(), 3);
    assert_eq!(summary.failure_message(), None);

    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value["status"], json!("pass"));
    assert_eq!(value["cleanup"], json!({ "status": "destroyed" }));
    assert_eq!(value["checks"][0]["name"], json!("Checking the Access for this ACR: probe"));
    assert!(value.get("failed_step").is_none());
}

/// Tests that a failed check is named and rendered as a FAIL line.
#[test]
fn failed_check_is_reported_per_line() {
    let summary = RunSummary::from_run("live", &finished_run(false, CleanupStatus::Destroyed));

    assert_eq!(summary.status, SummaryStatus::AssertionsFailed);
    let message = summary.failure_message().unwrap();
    assert!(message.contains("Validate the images pushed to ACR"));
    assert!(!message.contains("Checking the Access"));

    let markdown = summary.render_markdown();
    assert!(markdown.contains("- PASS Checking the Access for this ACR: probe\n"));
    assert!(markdown.contains(&format!(
        "- FAIL Validate the images pushed to ACR : {IMAGE} (expected true, got false)\n"
    )));
    assert!(markdown.contains("- push: degraded (denied)\n"));
    assert!(markdown.contains("- Cleanup: destroyed\n"));
}

/// Tests that an early fatal error records the failing step.
#[test]
fn fatal_error_records_failing_step() {
    let run = ScenarioRun {
        steps: vec![StepRecord {
            step: ScenarioStep::ReadOutputs,
            outcome: StepOutcome::Failed,
            message: None,
        }],
        outcome: Err(ScenarioError::MissingOutput("login_server".to_string())),
        cleanup: CleanupStatus::Destroyed,
    };
    let summary = RunSummary::from_run("live", &run);

    assert_eq!(summary.status, SummaryStatus::Error);
    assert_eq!(summary.failed_step, Some(ScenarioStep::ReadOutputs));
    assert!(summary.checks.is_empty());
    assert_eq!(
        serde_json::to_value(&summary).unwrap()["failed_step"],
        serde_json::to_value(ScenarioStep::ReadOutputs).unwrap()
    );
    let message = summary.failure_message().unwrap();
    assert!(message.contains("login_server"));
    assert!(summary.render_markdown().contains("## Failure"));
}

/// Tests that a failed destroy overrides passing assertions.
#[test]
fn cleanup_failure_overrides_passing_checks() {
    let cleanup = CleanupStatus::Failed("state locked".to_string());
    let summary = RunSummary::from_run("live", &finished_run(true, cleanup));

    assert_eq!(summary.status, SummaryStatus::CleanupFailed);
    assert_eq!(summary.failure_message().unwrap(), "destroy failed: state locked");
    assert!(summary.render_markdown().contains("- Cleanup: destroy failed: state locked\n"));
}

/// Tests skipped and interrupted summaries.
#[test]
fn skipped_and_interrupted_summaries() {
    let skipped = RunSummary::skipped("live", "SUB is not set").with_duration(7);
    assert_eq!(skipped.failure_message(), None);
    assert_eq!(skipped.duration_ms, 7);
    assert!(skipped.render_markdown().contains("## Checks\n\n- None\n"));

    let interrupted = RunSummary::interrupted("live", true);
    assert_eq!(interrupted.status, SummaryStatus::Interrupted);
    assert_eq!(interrupted.failure_message().unwrap(), "test panicked");
}
