// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed configuration for live system tests.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement. Invalid UTF-8
//! and blank values fail closed instead of falling back to defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Fixture config used when no override is set, relative to the crate root.
pub const DEFAULT_FIXTURE_CONFIG: &str = "fixtures/acr-probe.toml";

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Optional run root override.
    RunRoot,
    /// Optional probe config override.
    Config,
    /// Leave provisioned resources in place (`true`/`false` or `1`/`0`).
    KeepResources,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "ACR_PROBE_SYSTEM_TEST_RUN_ROOT",
            Self::Config => "ACR_PROBE_SYSTEM_TEST_CONFIG",
            Self::KeepResources => "ACR_PROBE_SYSTEM_TEST_KEEP_RESOURCES",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemTestConfig {
    /// Optional run root override.
    pub run_root: Option<PathBuf>,
    /// Optional probe config override.
    pub config: Option<PathBuf>,
    /// Leave provisioned resources in place.
    pub keep_resources: bool,
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or is not a recognized boolean literal.
    pub fn load() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`SystemTestConfig::load`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self, String> {
        let read = |key: SystemTestEnv| nonempty(key.as_str(), lookup(key.as_str()));
        let run_root = read(SystemTestEnv::RunRoot)?.map(PathBuf::from);
        let config = read(SystemTestEnv::Config)?.map(PathBuf::from);
        let keep_resources = parse_bool_env(
            SystemTestEnv::KeepResources.as_str(),
            read(SystemTestEnv::KeepResources)?,
        )?;
        Ok(Self {
            run_root,
            config,
            keep_resources,
        })
    }

    /// Returns the probe config path, falling back to the bundled fixture.
    #[must_use]
    pub fn config_path(&self, crate_root: &Path) -> PathBuf {
        self.config.clone().unwrap_or_else(|| crate_root.join(DEFAULT_FIXTURE_CONFIG))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    strict(name, std::env::var_os(name))
}

/// Converts a raw value to UTF-8.
fn strict(name: &str, raw: Option<OsString>) -> Result<Option<String>, String> {
    raw.map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Converts a raw value to UTF-8 and rejects empty values.
fn nonempty(name: &str, raw: Option<OsString>) -> Result<Option<String>, String> {
    match strict(name, raw)? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a boolean environment variable; unset means `false`.
///
/// # Errors
///
/// Returns an error when the value is not a recognized boolean literal.
fn parse_bool_env(name: &str, raw: Option<String>) -> Result<bool, String> {
    let Some(value) = raw else {
        return Ok(false);
    };
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(format!("{name} must be 1, 0, true, or false"))
}
