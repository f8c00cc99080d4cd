// crates/acr-probe-core/src/token.rs
// ============================================================================
// Module: Access-Token Provider
// Description: Bearer tokens for the cloud management API.
// Purpose: Obtain a fresh token per run from the identity CLI.
// Dependencies: crate::process
// ============================================================================

//! ## Overview
//! [`AzureCliTokenProvider`] shells out to
//! `az account get-access-token --query accessToken --output tsv
//! --subscription <id>` and returns the trimmed standard output. There is no
//! retry: a failed call is surfaced immediately.
//! [`StaticTokenProvider`] returns a token supplied up front.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::process::CommandRunner;
use crate::process::CommandSpec;
use crate::process::ProcessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default identity CLI executable.
pub const DEFAULT_IDENTITY_CLI: &str = "az";

// ============================================================================
// SECTION: Access Token
// ============================================================================

/// Opaque bearer token. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in an `Authorization` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

// ============================================================================
// SECTION: Provider Trait
// ============================================================================

/// Source of management-API bearer tokens.
pub trait AccessTokenProvider: Send + Sync {
    /// Returns a token scoped to the subscription.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the token cannot be obtained.
    fn access_token(&self, subscription_id: &str) -> Result<AccessToken, ProcessError>;
}

// ============================================================================
// SECTION: Identity CLI Provider
// ============================================================================

/// Token provider backed by the Azure identity CLI.
pub struct AzureCliTokenProvider<R> {
    /// Runner used to invoke the CLI.
    runner: R,
    /// CLI executable.
    program: String,
}

impl<R: CommandRunner> AzureCliTokenProvider<R> {
    /// Creates a provider invoking `az`.
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self::with_program(runner, DEFAULT_IDENTITY_CLI)
    }

    /// Creates a provider invoking a custom executable with the same contract.
    #[must_use]
    pub fn with_program(runner: R, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Builds the token command for a subscription.
    #[must_use]
    pub fn command(&self, subscription_id: &str) -> CommandSpec {
        CommandSpec::new(self.program.as_str()).args([
            "account",
            "get-access-token",
            "--query",
            "accessToken",
            "--output",
            "tsv",
            "--subscription",
            subscription_id,
        ])
    }
}

impl<R: CommandRunner> AccessTokenProvider for AzureCliTokenProvider<R> {
    fn access_token(&self, subscription_id: &str) -> Result<AccessToken, ProcessError> {
        let spec = self.command(subscription_id);
        let output = self.runner.run_checked(&spec)?;
        let token = output.stdout.trim();
        if token.is_empty() {
            return Err(ProcessError::EmptyOutput {
                command: spec.display_line(),
            });
        }
        Ok(AccessToken::new(token))
    }
}

// ============================================================================
// SECTION: Static Provider
// ============================================================================

/// Provider returning a fixed token regardless of subscription.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    /// Token handed out on every call.
    token: AccessToken,
}

impl StaticTokenProvider {
    /// Creates a provider for the given token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

impl AccessTokenProvider for StaticTokenProvider {
    fn access_token(&self, _subscription_id: &str) -> Result<AccessToken, ProcessError> {
        Ok(self.token.clone())
    }
}
