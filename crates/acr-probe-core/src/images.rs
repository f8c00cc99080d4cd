// crates/acr-probe-core/src/images.rs
// ============================================================================
// Module: Image Operations
// Description: Tag, login, push, pull, list, and delete through a container CLI.
// Purpose: Wrap the container runtime's command-line contract.
// Dependencies: crate::process, crate::events
// ============================================================================

//! ## Overview
//! [`ImageOperations`] drives a Docker-compatible CLI. Each operation maps to
//! one invocation (`tag`, `login`, `push`, `pull`, `images`, `rmi`).
//!
//! The operations deliberately differ in how failures surface:
//! - tagging returns an error that callers treat as fatal;
//! - push returns the underlying error;
//! - pull collapses a failure to `false` and only logs the error;
//! - deleting local images stops at the first failing `rmi`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::events::NoopEventSink;
use crate::events::ProbeEvent;
use crate::events::ProbeEventSink;
use crate::process::CommandRunner;
use crate::process::CommandSpec;
use crate::process::ProcessError;
use crate::report::ScenarioStep;
use crate::report::StepOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default container CLI executable.
pub const DEFAULT_CONTAINER_CLI: &str = "docker";
/// Go template used to list local images as `repository:tag`.
pub const IMAGE_LIST_FORMAT: &str = "{{.Repository}}:{{.Tag}}";

// ============================================================================
// SECTION: Image References
// ============================================================================

/// Builds `{login_server}/{repository}:{tag}`.
#[must_use]
pub fn registry_image_reference(login_server: &str, repository: &str, tag: &str) -> String {
    let server = login_server.trim_end_matches('/');
    format!("{server}/{repository}:{tag}")
}

// ============================================================================
// SECTION: Image Operations
// ============================================================================

/// Container CLI facade.
pub struct ImageOperations<R> {
    /// Runner used for every invocation.
    runner: R,
    /// Container CLI executable.
    program: String,
    /// Sink for diagnostics that do not surface as errors.
    events: Arc<dyn ProbeEventSink>,
}

impl<R: CommandRunner> ImageOperations<R> {
    /// Creates a facade over `docker`.
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self::with_program(runner, DEFAULT_CONTAINER_CLI)
    }

    /// Creates a facade over a Docker-compatible executable.
    #[must_use]
    pub fn with_program(runner: R, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            events: Arc::new(NoopEventSink),
        }
    }

    /// Routes diagnostics to the given sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn ProbeEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Starts a command for the container CLI.
    fn command(&self) -> CommandSpec {
        CommandSpec::new(self.program.as_str())
    }

    /// Tags `source` as `target` and returns `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when tagging fails. Every later step depends on
    /// the tag, so callers stop the run on this error.
    pub fn tag_image(&self, source: &str, target: &str) -> Result<String, ProcessError> {
        self.runner.run_checked(&self.command().args(["tag", source, target]))?;
        Ok(target.to_string())
    }

    /// Logs in to a registry.
    ///
    /// The password is passed as a secret argument and never rendered.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when authentication fails.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        registry_server: &str,
    ) -> Result<(), ProcessError> {
        let spec = self
            .command()
            .args(["login", registry_server, "--username", username, "--password"])
            .secret_arg(password);
        self.runner.run_checked(&spec)?;
        Ok(())
    }

    /// Pushes an image.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the push fails.
    pub fn push(&self, image: &str) -> Result<(), ProcessError> {
        self.runner.run_checked(&self.command().args(["push", image]))?;
        Ok(())
    }

    /// Pulls an image and reports whether it succeeded.
    ///
    /// A failure is reported as `false`; the error is recorded as a
    /// `pull.error_discarded` event and not returned.
    #[must_use]
    pub fn pull(&self, image: &str) -> bool {
        match self.runner.run_checked(&self.command().args(["pull", image])) {
            Ok(_) => true,
            Err(err) => {
                self.events.record(
                    &ProbeEvent::new("pull.error_discarded")
                        .step(ScenarioStep::Pull)
                        .outcome(StepOutcome::Degraded)
                        .message(err.to_string()),
                );
                false
            }
        }
    }

    /// Lists local images as `repository:tag`, skipping blank lines.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the listing command fails.
    pub fn list_local_images(&self) -> Result<Vec<String>, ProcessError> {
        let spec = self.command().args(["images", "--format", IMAGE_LIST_FORMAT]);
        let output = self.runner.run_checked(&spec)?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Force-removes every local image and returns the removed references.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProcessError`]; remaining images are left in place.
    pub fn delete_all_local_images(&self) -> Result<Vec<String>, ProcessError> {
        let images = self.list_local_images()?;
        let mut deleted = Vec::with_capacity(images.len());
        for image in images {
            self.runner.run_checked(&self.command().args(["rmi", "-f", image.as_str()]))?;
            self.events.record(
                &ProbeEvent::new("image.deleted")
                    .step(ScenarioStep::DeleteLocal)
                    .outcome(StepOutcome::Ok)
                    .message(image.as_str()),
            );
            deleted.push(image);
        }
        Ok(deleted)
    }
}
