// crates/acr-probe-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Scripted fakes for the probe's external collaborators.
// Purpose: Run gateways and the orchestrator without real tools or clouds.
// Dependencies: acr-probe-core, serde_json
// ============================================================================

//! ## Overview
//! [`ScriptedRunner`] answers commands from a rule table and records every
//! invocation. [`MemoryEventSink`], [`FakeProvisioner`], and [`FakeRegistry`]
//! stand in for the event log, the provisioning tool, and the management API.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]
#![allow(dead_code, reason = "Each test binary uses a different subset of helpers.")]

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use acr_probe_core::AccessToken;
use acr_probe_core::CommandOutput;
use acr_probe_core::CommandRunner;
use acr_probe_core::CommandSpec;
use acr_probe_core::ProbeEvent;
use acr_probe_core::ProbeEventSink;
use acr_probe_core::ProcessError;
use acr_probe_core::ProvisionError;
use acr_probe_core::Provisioner;
use acr_probe_core::ProvisioningOutputs;
use acr_probe_core::RegistryApiError;
use acr_probe_core::RegistryDetails;
use acr_probe_core::RegistryReader;
use serde_json::Value;

// ============================================================================
// SECTION: Command Outputs
// ============================================================================

/// Successful output with the given stdout.
pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

/// Failed output with the given exit code and stderr.
pub fn fail(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

// ============================================================================
// SECTION: Scripted Runner
// ============================================================================

/// One scripted response.
struct Rule {
    /// Program the rule applies to.
    program: String,
    /// Leading arguments that must match.
    prefix: Vec<String>,
    /// Output returned on match.
    output: CommandOutput,
}

/// Command runner answering from a rule table.
///
/// The most recently added matching rule wins. Unmatched commands succeed
/// with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    /// Response rules.
    rules: Mutex<Vec<Rule>>,
    /// Every command received, in order.
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    /// Creates a runner with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule for `program` invoked with the given leading arguments.
    pub fn respond(&self, program: &str, prefix: &[&str], output: CommandOutput) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            program: program.to_string(),
            prefix: prefix.iter().map(ToString::to_string).collect(),
            output,
        });
        self
    }

    /// Returns every received command.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns redacted command lines of every received command.
    pub fn lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::display_line).collect()
    }

    /// Counts received commands whose first argument is `verb`.
    pub fn count(&self, verb: &str) -> usize {
        self.calls().iter().filter(|spec| spec.arg_values().first() == Some(&verb)).count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        self.calls.lock().unwrap().push(spec.clone());
        let args = spec.arg_values();
        let rules = self.rules.lock().unwrap();
        let matched = rules.iter().rev().find(|rule| {
            rule.program == spec.program()
                && rule.prefix.len() <= args.len()
                && rule.prefix.iter().zip(&args).all(|(want, got)| want == got)
        });
        Ok(matched.map_or_else(|| ok(""), |rule| rule.output.clone()))
    }
}

// ============================================================================
// SECTION: Event Sink
// ============================================================================

/// Sink keeping events in memory.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events.
    events: Mutex<Vec<ProbeEvent>>,
}

impl MemoryEventSink {
    /// Returns every recorded event.
    pub fn events(&self) -> Vec<ProbeEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns the names of every recorded event.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }

    /// Serializes every event as JSON lines.
    pub fn json_lines(&self) -> String {
        self.events()
            .iter()
            .map(|event| serde_json::to_string(event).unwrap())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ProbeEventSink for MemoryEventSink {
    fn record(&self, event: &ProbeEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Fake Provisioner
// ============================================================================

/// Provisioner returning canned outputs and counting destroys.
#[derive(Default)]
pub struct FakeProvisioner {
    /// Outputs returned by apply; `None` makes apply fail.
    outputs: Option<BTreeMap<String, String>>,
    /// Makes destroy fail.
    destroy_fails: bool,
    /// Number of apply calls.
    applies: AtomicUsize,
    /// Number of destroy calls.
    destroys: AtomicUsize,
}

impl FakeProvisioner {
    /// Provisioner whose apply yields the standard outputs.
    pub fn healthy() -> Self {
        Self::with_outputs(&[
            ("acr_name", "acrprobe"),
            ("resource_group_name", "rg-acr-probe"),
            ("login_server", "acrprobe.azurecr.io"),
            ("acr_admin_password", "s3cret-password"),
        ])
    }

    /// Provisioner whose apply yields the given outputs.
    pub fn with_outputs(pairs: &[(&str, &str)]) -> Self {
        let outputs =
            pairs.iter().map(|(name, value)| ((*name).to_string(), (*value).to_string())).collect();
        Self {
            outputs: Some(outputs),
            ..Self::default()
        }
    }

    /// Provisioner whose apply fails.
    pub fn failing_apply() -> Self {
        Self::default()
    }

    /// Makes destroy fail.
    pub fn with_failing_destroy(mut self) -> Self {
        self.destroy_fails = true;
        self
    }

    /// Returns how often apply ran.
    pub fn applies(&self) -> usize {
        self.applies.load(Ordering::SeqCst)
    }

    /// Returns how often destroy ran.
    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

impl Provisioner for FakeProvisioner {
    fn apply(&self) -> Result<ProvisioningOutputs, ProvisionError> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        self.outputs.clone().map(ProvisioningOutputs::new).ok_or_else(|| {
            ProvisionError::Process(ProcessError::NonZeroExit {
                command: "terraform apply".to_string(),
                status: "exit code 1".to_string(),
                stderr: "quota exceeded".to_string(),
            })
        })
    }

    fn destroy(&self) -> Result<(), ProvisionError> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        if self.destroy_fails {
            return Err(ProvisionError::Decode("destroy exploded".to_string()));
        }
        Ok(())
    }

    fn output(&self, name: &str) -> Result<String, ProvisionError> {
        Ok(self
            .outputs
            .as_ref()
            .and_then(|outputs| outputs.get(name).cloned())
            .unwrap_or_default())
    }
}

// ============================================================================
// SECTION: Fake Registry
// ============================================================================

/// Registry reader returning a fixed document or a status error.
pub struct FakeRegistry {
    /// Document returned on success.
    details: Option<Value>,
    /// Requests received as `(token, subscription, group, name)`.
    requests: Mutex<Vec<(String, String, String, String)>>,
}

impl FakeRegistry {
    /// Reader returning the given JSON object.
    pub fn returning(details: Value) -> Self {
        Self {
            details: Some(details),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reader reporting `publicNetworkAccess` as `mode`.
    pub fn with_access(mode: &str) -> Self {
        Self::returning(serde_json::json!({
            "name": "acrprobe",
            "properties": { "publicNetworkAccess": mode }
        }))
    }

    /// Reader failing with HTTP 403.
    pub fn forbidden() -> Self {
        Self {
            details: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns the received requests.
    pub fn requests(&self) -> Vec<(String, String, String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

impl RegistryReader for FakeRegistry {
    fn registry_details(
        &self,
        token: &AccessToken,
        subscription_id: &str,
        resource_group: &str,
        registry_name: &str,
    ) -> Result<RegistryDetails, RegistryApiError> {
        self.requests.lock().unwrap().push((
            token.as_str().to_string(),
            subscription_id.to_string(),
            resource_group.to_string(),
            registry_name.to_string(),
        ));
        match &self.details {
            Some(Value::Object(fields)) => Ok(RegistryDetails::new(fields.clone())),
            Some(_) => Err(RegistryApiError::Decode("not an object".to_string())),
            None => Err(RegistryApiError::Status {
                status: 403,
                message: "AuthorizationFailed: no access".to_string(),
            }),
        }
    }
}
