// crates/acr-probe-core/src/provision.rs
// ============================================================================
// Module: Provisioning Gateway
// Description: Infrastructure-as-code apply, output, and destroy.
// Purpose: Create the registry under test and guarantee it is torn down.
// Dependencies: serde_json, thiserror, crate::process
// ============================================================================

//! ## Overview
//! [`TerraformProvisioner`] runs `init` + `apply`, reads outputs with
//! `output -json`, and runs `destroy` against one module directory and its
//! variable files. `tofu` works with the same contract.
//!
//! [`DestroyGuard`] makes destroy run exactly once on every exit path: it is
//! armed before apply, completed explicitly at the end of a run, and falls
//! back to destroying on drop (including unwinding).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::events::ProbeEvent;
use crate::events::ProbeEventSink;
use crate::process::CommandRunner;
use crate::process::CommandSpec;
use crate::process::ProcessError;
use crate::report::CleanupStatus;
use crate::report::ScenarioStep;
use crate::report::StepOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default provisioning tool executable.
pub const DEFAULT_PROVISIONING_TOOL: &str = "terraform";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by provisioners.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The provisioning tool failed.
    #[error(transparent)]
    Process(#[from] ProcessError),
    /// Output JSON could not be decoded.
    #[error("output decode failure: {0}")]
    Decode(String),
}

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// Named provisioning outputs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProvisioningOutputs(BTreeMap<String, String>);

impl ProvisioningOutputs {
    /// Wraps an output map.
    #[must_use]
    pub const fn new(values: BTreeMap<String, String>) -> Self {
        Self(values)
    }

    /// Decodes `output -json` text: `{"name": {"value": ..., ...}, ...}`.
    ///
    /// String values are kept verbatim; other values are rendered as compact
    /// JSON. Blank input yields no outputs.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Decode`] when the text is not an output document.
    pub fn from_json(raw: &str) -> Result<Self, ProvisionError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let document: Value =
            serde_json::from_str(raw).map_err(|err| ProvisionError::Decode(err.to_string()))?;
        let Value::Object(entries) = document else {
            return Err(ProvisionError::Decode("expected a JSON object of outputs".to_string()));
        };
        let mut values = BTreeMap::new();
        for (name, entry) in entries {
            let rendered = match entry.get("value") {
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
                None => {
                    return Err(ProvisionError::Decode(format!("output {name} has no value")));
                }
            };
            values.insert(name, rendered);
        }
        Ok(Self(values))
    }

    /// Returns an output value, or the empty string when it does not exist.
    #[must_use]
    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map_or("", String::as_str)
    }

    /// Returns true when the output exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns the output names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// ============================================================================
// SECTION: Provisioner Trait
// ============================================================================

/// Creates, inspects, and destroys the infrastructure under test.
pub trait Provisioner: Send + Sync {
    /// Creates resources and returns every output.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when provisioning fails.
    fn apply(&self) -> Result<ProvisioningOutputs, ProvisionError>;

    /// Destroys resources.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when destroy fails.
    fn destroy(&self) -> Result<(), ProvisionError>;

    /// Returns one output, or the empty string when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when outputs cannot be read at all.
    fn output(&self, name: &str) -> Result<String, ProvisionError>;
}

// ============================================================================
// SECTION: Terraform Provisioner
// ============================================================================

/// Provisioner driving `terraform` (or `tofu`) in one module directory.
pub struct TerraformProvisioner<R> {
    /// Runner used for every invocation.
    runner: R,
    /// Tool executable.
    program: String,
    /// Module directory the tool runs in.
    module_dir: PathBuf,
    /// Variable files passed to apply and destroy.
    var_files: Vec<PathBuf>,
}

impl<R: CommandRunner> TerraformProvisioner<R> {
    /// Creates a provisioner invoking `terraform`.
    #[must_use]
    pub fn new(runner: R, module_dir: impl Into<PathBuf>, var_files: Vec<PathBuf>) -> Self {
        Self {
            runner,
            program: DEFAULT_PROVISIONING_TOOL.to_string(),
            module_dir: module_dir.into(),
            var_files,
        }
    }

    /// Overrides the tool executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Returns the module directory.
    #[must_use]
    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    /// Starts a command in the module directory.
    fn command(&self) -> CommandSpec {
        CommandSpec::new(self.program.as_str()).current_dir(self.module_dir.as_path())
    }

    /// Appends `-var-file=<path>` for each variable file.
    fn with_var_files(&self, spec: CommandSpec) -> CommandSpec {
        self.var_files
            .iter()
            .fold(spec, |spec, path| spec.arg(format!("-var-file={}", path.display())))
    }

    /// Builds the `init` command.
    #[must_use]
    pub fn init_command(&self) -> CommandSpec {
        self.command().args(["init", "-input=false", "-no-color"])
    }

    /// Builds the `apply` command.
    #[must_use]
    pub fn apply_command(&self) -> CommandSpec {
        self.with_var_files(self.command().args([
            "apply",
            "-auto-approve",
            "-input=false",
            "-no-color",
        ]))
    }

    /// Builds the `destroy` command.
    #[must_use]
    pub fn destroy_command(&self) -> CommandSpec {
        self.with_var_files(self.command().args([
            "destroy",
            "-auto-approve",
            "-input=false",
            "-no-color",
        ]))
    }

    /// Builds the `output` command.
    #[must_use]
    pub fn output_command(&self) -> CommandSpec {
        self.command().args(["output", "-no-color", "-json"])
    }

    /// Reads every output.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when the output command fails or prints
    /// something other than an output document.
    pub fn outputs(&self) -> Result<ProvisioningOutputs, ProvisionError> {
        let output = self.runner.run_checked(&self.output_command())?;
        ProvisioningOutputs::from_json(&output.stdout)
    }
}

impl<R: CommandRunner> Provisioner for TerraformProvisioner<R> {
    fn apply(&self) -> Result<ProvisioningOutputs, ProvisionError> {
        self.runner.run_checked(&self.init_command())?;
        self.runner.run_checked(&self.apply_command())?;
        self.outputs()
    }

    fn destroy(&self) -> Result<(), ProvisionError> {
        self.runner.run_checked(&self.destroy_command())?;
        Ok(())
    }

    fn output(&self, name: &str) -> Result<String, ProvisionError> {
        Ok(self.outputs()?.get(name).to_string())
    }
}

// ============================================================================
// SECTION: Destroy Guard
// ============================================================================

/// Scoped cleanup that destroys provisioned resources exactly once.
pub struct DestroyGuard<'a> {
    /// Provisioner to destroy through.
    provisioner: &'a dyn Provisioner,
    /// Sink for the cleanup record.
    events: &'a dyn ProbeEventSink,
    /// Skip destroy and report retention.
    keep_resources: bool,
    /// Set once cleanup has run.
    done: bool,
}

impl<'a> DestroyGuard<'a> {
    /// Arms a guard. Create it before apply so partial applies are cleaned up.
    #[must_use]
    pub fn arm(
        provisioner: &'a dyn Provisioner,
        events: &'a dyn ProbeEventSink,
        keep_resources: bool,
    ) -> Self {
        Self {
            provisioner,
            events,
            keep_resources,
            done: false,
        }
    }

    /// Runs cleanup now and reports the result.
    #[must_use]
    pub fn complete(mut self) -> CleanupStatus {
        self.cleanup()
    }

    /// Runs cleanup once; later calls report retention without acting.
    fn cleanup(&mut self) -> CleanupStatus {
        if self.done {
            return CleanupStatus::Retained;
        }
        self.done = true;
        if self.keep_resources {
            self.events.record(
                &ProbeEvent::new("cleanup.skipped")
                    .step(ScenarioStep::Destroy)
                    .outcome(StepOutcome::Ok)
                    .message("keep_resources is set; provisioned resources were retained"),
            );
            return CleanupStatus::Retained;
        }
        self.events.record(&ProbeEvent::new("step.started").step(ScenarioStep::Destroy));
        match self.provisioner.destroy() {
            Ok(()) => {
                self.events.record(
                    &ProbeEvent::new("step.finished")
                        .step(ScenarioStep::Destroy)
                        .outcome(StepOutcome::Ok),
                );
                CleanupStatus::Destroyed
            }
            Err(err) => {
                self.events.record(
                    &ProbeEvent::new("step.finished")
                        .step(ScenarioStep::Destroy)
                        .outcome(StepOutcome::Failed)
                        .message(err.to_string()),
                );
                CleanupStatus::Failed(err.to_string())
            }
        }
    }
}

impl Drop for DestroyGuard<'_> {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
