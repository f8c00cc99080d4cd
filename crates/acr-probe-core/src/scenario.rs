// crates/acr-probe-core/src/scenario.rs
// ============================================================================
// Module: Scenario Orchestrator
// Description: End-to-end registry validation sequence.
// Purpose: Provision, exercise, and assert on a registry, then clean up.
// Dependencies: crate::{provision, token, registry_api, images, report, events}
// ============================================================================

//! ## Overview
//! The sequence is strictly linear:
//!
//! `Provision -> ReadOutputs -> FetchToken -> ReadRegistryConfig ->
//! ComputeTaggedRef -> Login -> Push -> DeleteLocal -> Pull -> AssertAll ->
//! (deferred) Destroy`
//!
//! Provision, ReadOutputs, FetchToken, ReadRegistryConfig, and tagging end the
//! run early with a [`ScenarioError`]. Login, push, local deletion, and pull
//! failures are recorded as degraded steps and the run continues. The three
//! assertions are evaluated independently. Destroy runs exactly once whatever
//! happened before it.
//!
//! A scenario holds no shared mutable state, so independent scenarios can run
//! concurrently in one test binary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::events::ProbeEvent;
use crate::events::ProbeEventSink;
use crate::images::ImageOperations;
use crate::images::registry_image_reference;
use crate::process::CommandRunner;
use crate::process::ProcessError;
use crate::provision::DestroyGuard;
use crate::provision::ProvisionError;
use crate::provision::Provisioner;
use crate::registry_api::RegistryApiError;
use crate::registry_api::RegistryReader;
use crate::registry_api::public_network_access;
use crate::report::AssertionResult;
use crate::report::CleanupStatus;
use crate::report::ScenarioReport;
use crate::report::ScenarioStep;
use crate::report::StepOutcome;
use crate::report::StepRecord;
use crate::token::AccessTokenProvider;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Names of the provisioning outputs the scenario reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNames {
    /// Registry name output.
    pub registry_name: String,
    /// Resource group output.
    pub resource_group: String,
    /// Login server output.
    pub login_server: String,
    /// Admin password output.
    pub admin_password: String,
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            registry_name: "acr_name".to_string(),
            resource_group: "resource_group_name".to_string(),
            login_server: "login_server".to_string(),
            admin_password: "acr_admin_password".to_string(),
        }
    }
}

/// Expected observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectations {
    /// Expected `publicNetworkAccess` value.
    pub public_network_access: String,
    /// Expected push result.
    pub push_succeeds: bool,
    /// Expected pull result.
    pub pull_succeeds: bool,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            public_network_access: "Disabled".to_string(),
            push_succeeds: true,
            pull_succeeds: true,
        }
    }
}

/// Fixture values for one scenario run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSettings {
    /// Subscription that owns the registry.
    pub subscription_id: String,
    /// Local image to tag and push.
    pub source_image: String,
    /// Repository name inside the registry.
    pub repository: String,
    /// Tag applied to the pushed image.
    pub tag: String,
    /// Expected observations.
    pub expectations: Expectations,
    /// Provisioning output names.
    pub outputs: OutputNames,
    /// Skip destroy at the end of the run.
    pub keep_resources: bool,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            source_image: "hello-world:latest".to_string(),
            repository: "hello-world".to_string(),
            tag: "1.0.1".to_string(),
            expectations: Expectations::default(),
            outputs: OutputNames::default(),
            keep_resources: false,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal errors that end a scenario before its assertions.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Provisioning failed.
    #[error("provisioning failed: {0}")]
    Provision(#[from] ProvisionError),
    /// A required provisioning output is missing or empty.
    #[error("provisioning output `{0}` is missing or empty")]
    MissingOutput(String),
    /// The access token could not be obtained.
    #[error("access token fetch failed: {0}")]
    Token(#[source] ProcessError),
    /// The registry configuration could not be read.
    #[error("registry details fetch failed: {0}")]
    Registry(#[from] RegistryApiError),
    /// Tagging the source image failed.
    #[error("image tagging failed: {0}")]
    Tag(#[source] ProcessError),
}

impl ScenarioError {
    /// Returns the step that failed.
    #[must_use]
    pub const fn step(&self) -> ScenarioStep {
        match self {
            Self::Provision(_) => ScenarioStep::Provision,
            Self::MissingOutput(_) => ScenarioStep::ReadOutputs,
            Self::Token(_) => ScenarioStep::FetchToken,
            Self::Registry(_) => ScenarioStep::ReadRegistryConfig,
            Self::Tag(_) => ScenarioStep::ComputeTaggedRef,
        }
    }
}

// ============================================================================
// SECTION: Collaborators
// ============================================================================

/// External systems a scenario drives.
pub struct Collaborators<'a, R> {
    /// Infrastructure provisioner.
    pub provisioner: &'a dyn Provisioner,
    /// Bearer-token source.
    pub tokens: &'a dyn AccessTokenProvider,
    /// Registry configuration reader.
    pub registry: &'a dyn RegistryReader,
    /// Container CLI facade.
    pub images: &'a ImageOperations<R>,
    /// Event sink for step records.
    pub events: &'a dyn ProbeEventSink,
}

// ============================================================================
// SECTION: Run Result
// ============================================================================

/// Everything a scenario run produced.
#[derive(Debug)]
pub struct ScenarioRun {
    /// Finished steps, in order.
    pub steps: Vec<StepRecord>,
    /// Report, or the fatal error that ended the run early.
    pub outcome: Result<ScenarioReport, ScenarioError>,
    /// Cleanup result.
    pub cleanup: CleanupStatus,
}

impl ScenarioRun {
    /// Returns true when the run reached the end and every assertion passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome.as_ref().is_ok_and(ScenarioReport::all_passed)
    }

    /// Returns the outcome record for a step, if it finished.
    #[must_use]
    pub fn step(&self, step: ScenarioStep) -> Option<&StepRecord> {
        self.steps.iter().find(|record| record.step == step)
    }
}

// ============================================================================
// SECTION: Orchestration
// ============================================================================

/// Runs the full scenario and always attempts cleanup.
pub fn run_scenario<R: CommandRunner>(
    settings: &ScenarioSettings,
    parts: &Collaborators<'_, R>,
) -> ScenarioRun {
    let guard = DestroyGuard::arm(parts.provisioner, parts.events, settings.keep_resources);
    let mut steps = StepTracker::new(parts.events);
    let outcome = execute(settings, parts, &mut steps);
    if let Err(err) = &outcome {
        steps.finish(err.step(), StepOutcome::Failed, Some(err.to_string()));
    }
    let cleanup = guard.complete();
    ScenarioRun {
        steps: steps.into_records(),
        outcome,
        cleanup,
    }
}

/// Executes every step up to the assertions.
fn execute<R: CommandRunner>(
    settings: &ScenarioSettings,
    parts: &Collaborators<'_, R>,
    steps: &mut StepTracker<'_>,
) -> Result<ScenarioReport, ScenarioError> {
    steps.start(ScenarioStep::Provision);
    let outputs = parts.provisioner.apply()?;
    steps.finish(ScenarioStep::Provision, StepOutcome::Ok, None);

    steps.start(ScenarioStep::ReadOutputs);
    let names = &settings.outputs;
    let registry_name = required_output(outputs.get(&names.registry_name), &names.registry_name)?;
    let resource_group =
        required_output(outputs.get(&names.resource_group), &names.resource_group)?;
    let login_server = required_output(outputs.get(&names.login_server), &names.login_server)?;
    let password = outputs.get(&names.admin_password);
    let found = format!("registry {registry_name}");
    steps.finish(ScenarioStep::ReadOutputs, StepOutcome::Ok, Some(found));

    steps.start(ScenarioStep::FetchToken);
    let token =
        parts.tokens.access_token(&settings.subscription_id).map_err(ScenarioError::Token)?;
    steps.finish(ScenarioStep::FetchToken, StepOutcome::Ok, None);

    steps.start(ScenarioStep::ReadRegistryConfig);
    let details = parts.registry.registry_details(
        &token,
        &settings.subscription_id,
        resource_group,
        registry_name,
    )?;
    let access = public_network_access(&details);
    steps.finish(
        ScenarioStep::ReadRegistryConfig,
        StepOutcome::Ok,
        Some(format!("publicNetworkAccess {access}")),
    );

    steps.start(ScenarioStep::ComputeTaggedRef);
    let target = registry_image_reference(login_server, &settings.repository, &settings.tag);
    let image =
        parts.images.tag_image(&settings.source_image, &target).map_err(ScenarioError::Tag)?;
    steps.finish(
        ScenarioStep::ComputeTaggedRef,
        StepOutcome::Ok,
        Some(format!("{} tagged as {image}", settings.source_image)),
    );

    steps.start(ScenarioStep::Login);
    match parts.images.login(registry_name, password, login_server) {
        Ok(()) => steps.finish(ScenarioStep::Login, StepOutcome::Ok, None),
        Err(err) => {
            steps.finish(ScenarioStep::Login, StepOutcome::Degraded, Some(err.to_string()));
        }
    }

    steps.start(ScenarioStep::Push);
    let pushed = match parts.images.push(&image) {
        Ok(()) => {
            steps.finish(ScenarioStep::Push, StepOutcome::Ok, None);
            true
        }
        Err(err) => {
            steps.finish(ScenarioStep::Push, StepOutcome::Degraded, Some(err.to_string()));
            false
        }
    };

    steps.start(ScenarioStep::DeleteLocal);
    match parts.images.delete_all_local_images() {
        Ok(deleted) => steps.finish(
            ScenarioStep::DeleteLocal,
            StepOutcome::Ok,
            Some(format!("{} image(s) removed", deleted.len())),
        ),
        Err(err) => {
            steps.finish(ScenarioStep::DeleteLocal, StepOutcome::Degraded, Some(err.to_string()));
        }
    }

    steps.start(ScenarioStep::Pull);
    let pulled = parts.images.pull(&image);
    if pulled {
        steps.finish(ScenarioStep::Pull, StepOutcome::Ok, None);
    } else {
        steps.finish(ScenarioStep::Pull, StepOutcome::Degraded, Some("pull failed".to_string()));
    }

    steps.start(ScenarioStep::AssertAll);
    let expected = &settings.expectations;
    let checks = vec![
        AssertionResult::equal(
            format!("Checking the Access for this ACR: {registry_name}"),
            expected.public_network_access.as_str(),
            access.as_str(),
        ),
        AssertionResult::equal(
            format!("Validate the images pushed to ACR : {image}"),
            &expected.push_succeeds,
            &pushed,
        ),
        AssertionResult::equal(
            format!("Validate the pulled images from ACR : {image}"),
            &expected.pull_succeeds,
            &pulled,
        ),
    ];
    let report = ScenarioReport {
        registry_name: registry_name.to_string(),
        image_reference: image,
        public_network_access: access,
        pushed,
        pulled,
        checks,
    };
    let outcome = if report.all_passed() { StepOutcome::Ok } else { StepOutcome::Degraded };
    let failed = report.failures().len();
    steps.finish(ScenarioStep::AssertAll, outcome, Some(format!("{failed} check(s) failed")));
    Ok(report)
}

/// Rejects an empty output value.
fn required_output<'v>(value: &'v str, name: &str) -> Result<&'v str, ScenarioError> {
    if value.trim().is_empty() {
        return Err(ScenarioError::MissingOutput(name.to_string()));
    }
    Ok(value)
}

// ============================================================================
// SECTION: Step Tracking
// ============================================================================

/// Collects step records and mirrors them to the event sink.
struct StepTracker<'a> {
    /// Sink for step events.
    events: &'a dyn ProbeEventSink,
    /// Finished steps.
    records: Vec<StepRecord>,
}

impl<'a> StepTracker<'a> {
    /// Creates an empty tracker.
    fn new(events: &'a dyn ProbeEventSink) -> Self {
        Self {
            events,
            records: Vec::new(),
        }
    }

    /// Records the start of a step.
    fn start(&self, step: ScenarioStep) {
        self.events.record(&ProbeEvent::new("step.started").step(step));
    }

    /// Records the end of a step.
    fn finish(&mut self, step: ScenarioStep, outcome: StepOutcome, message: Option<String>) {
        let mut event = ProbeEvent::new("step.finished").step(step).outcome(outcome);
        if let Some(message) = &message {
            event = event.message(message.as_str());
        }
        self.events.record(&event);
        self.records.push(StepRecord {
            step,
            outcome,
            message,
        });
    }

    /// Returns the collected records.
    fn into_records(self) -> Vec<StepRecord> {
        self.records
    }
}
