// crates/acr-probe-core/src/lib.rs
// ============================================================================
// Module: ACR Probe Core Library
// Description: Gateways and orchestration for container-registry validation.
// Purpose: Provision a registry, exercise it, assert on it, and clean it up.
// Dependencies: reqwest, serde, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! ACR Probe Core drives four external systems behind narrow seams:
//! - [`Provisioner`] creates and destroys infrastructure (`terraform`).
//! - [`AccessTokenProvider`] issues management-API bearer tokens (`az`).
//! - [`RegistryReader`] reads registry configuration over HTTPS.
//! - [`ImageOperations`] drives a Docker-compatible CLI through a
//!   [`CommandRunner`].
//!
//! [`run_scenario`] sequences them and returns a [`ScenarioRun`].
//! Invariants:
//! - Destroy runs exactly once per scenario on every exit path.
//! - Secrets (passwords, tokens) never appear in events or errors.
//! - Assertions are evaluated independently; one failure never hides another.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod events;
pub mod images;
pub mod process;
pub mod provision;
pub mod registry_api;
pub mod report;
pub mod scenario;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use events::FileEventSink;
pub use events::NoopEventSink;
pub use events::ProbeEvent;
pub use events::ProbeEventSink;
pub use events::StderrEventSink;
pub use images::ImageOperations;
pub use images::registry_image_reference;
pub use process::CommandOutput;
pub use process::CommandRunner;
pub use process::CommandSpec;
pub use process::ProcessError;
pub use process::SystemCommandRunner;
pub use provision::DestroyGuard;
pub use provision::ProvisionError;
pub use provision::Provisioner;
pub use provision::ProvisioningOutputs;
pub use provision::TerraformProvisioner;
pub use registry_api::RegistryApiClient;
pub use registry_api::RegistryApiConfig;
pub use registry_api::RegistryApiError;
pub use registry_api::RegistryDetails;
pub use registry_api::RegistryReader;
pub use registry_api::StatusPolicy;
pub use registry_api::public_network_access;
pub use report::AssertionFailure;
pub use report::AssertionResult;
pub use report::CleanupStatus;
pub use report::ScenarioReport;
pub use report::ScenarioStep;
pub use report::StepOutcome;
pub use report::StepRecord;
pub use scenario::Collaborators;
pub use scenario::Expectations;
pub use scenario::OutputNames;
pub use scenario::ScenarioError;
pub use scenario::ScenarioRun;
pub use scenario::ScenarioSettings;
pub use scenario::run_scenario;
pub use token::AccessToken;
pub use token::AccessTokenProvider;
pub use token::AzureCliTokenProvider;
pub use token::StaticTokenProvider;
