// crates/acr-probe-config/src/config.rs
// ============================================================================
// Module: ACR Probe Configuration
// Description: Configuration loading and validation for acr-probe.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: acr-probe-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and defaults to the private-registry fixture.
//! Relative paths are resolved against the directory of the config file.
//!
//! The subscription id is never stored in the file; it is read from the
//! environment variable named by `identity.subscription_env`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::ffi::OsString;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use acr_probe_core::RegistryApiConfig;
use acr_probe_core::StatusPolicy;
use acr_probe_core::images::DEFAULT_CONTAINER_CLI;
use acr_probe_core::provision::DEFAULT_PROVISIONING_TOOL;
use acr_probe_core::registry_api::DEFAULT_MANAGEMENT_ENDPOINT;
use acr_probe_core::registry_api::REGISTRY_API_VERSION;
use acr_probe_core::scenario::Expectations;
use acr_probe_core::scenario::OutputNames;
use acr_probe_core::scenario::ScenarioSettings;
use acr_probe_core::token::DEFAULT_IDENTITY_CLI;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "acr-probe.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "ACR_PROBE_CONFIG";
/// Default environment variable carrying the subscription id.
pub const DEFAULT_SUBSCRIPTION_ENV: &str = "TF_VAR_azure_subscription_id";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default management API timeout in milliseconds.
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Minimum management API timeout in milliseconds.
pub(crate) const MIN_TIMEOUT_MS: u64 = 1_000;
/// Maximum management API timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 300_000;
/// Maximum image tag length accepted by registries.
pub(crate) const MAX_TAG_LENGTH: usize = 128;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// ACR probe configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    /// Provisioning tool and module settings.
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    /// Names of the provisioning outputs to read.
    #[serde(default)]
    pub outputs: OutputsConfig,
    /// Identity CLI settings.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Management API settings.
    #[serde(default)]
    pub management: ManagementConfig,
    /// Container CLI and image fixture settings.
    #[serde(default)]
    pub container: ContainerConfig,
    /// Expected observations.
    #[serde(default)]
    pub expectations: ExpectationsConfig,
    /// Event log settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Directory relative paths are resolved against (not serialized).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl ProbeConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// explicit path, then [`CONFIG_ENV_VAR`], then [`DEFAULT_CONFIG_NAME`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_config_path(path)?;
        validate_path(&resolved)?;
        let bytes = read_capped(&resolved)?;
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let base_dir = resolved
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self::from_toml_str(content, &base_dir)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.base_dir = base_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provisioning.validate()?;
        self.outputs.validate()?;
        self.identity.validate()?;
        self.management.validate()?;
        self.container.validate()?;
        self.expectations.validate()?;
        self.logging.validate()
    }

    /// Resolves a configured path against [`ProbeConfig::base_dir`].
    #[must_use]
    pub fn resolve(&self, value: &str) -> PathBuf {
        let path = Path::new(value.trim());
        if path.is_absolute() { path.to_path_buf() } else { self.base_dir.join(path) }
    }

    /// Returns the resolved provisioning module directory.
    #[must_use]
    pub fn module_dir(&self) -> PathBuf {
        self.resolve(&self.provisioning.module_dir)
    }

    /// Returns the resolved variable files.
    #[must_use]
    pub fn var_files(&self) -> Vec<PathBuf> {
        self.provisioning.var_files.iter().map(|file| self.resolve(file)).collect()
    }

    /// Returns the resolved event log path when the file sink is selected.
    #[must_use]
    pub fn log_path(&self) -> Option<PathBuf> {
        match (self.logging.sink, &self.logging.path) {
            (LogSink::File, Some(path)) => Some(self.resolve(path)),
            _ => None,
        }
    }

    /// Reads the subscription id from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] when the variable is unset, empty, or not
    /// valid UTF-8.
    pub fn subscription_id(&self) -> Result<String, ConfigError> {
        let name = self.identity.subscription_env.as_str();
        subscription_id_from(name, env::var_os(name))
    }

    /// Builds scenario settings for the given subscription.
    #[must_use]
    pub fn scenario_settings(&self, subscription_id: String) -> ScenarioSettings {
        ScenarioSettings {
            subscription_id,
            source_image: self.container.source_image.clone(),
            repository: self.container.repository.clone(),
            tag: self.container.tag.clone(),
            expectations: Expectations {
                public_network_access: self.expectations.public_network_access.clone(),
                push_succeeds: self.expectations.push_succeeds,
                pull_succeeds: self.expectations.pull_succeeds,
            },
            outputs: OutputNames {
                registry_name: self.outputs.registry_name.clone(),
                resource_group: self.outputs.resource_group.clone(),
                login_server: self.outputs.login_server.clone(),
                admin_password: self.outputs.admin_password.clone(),
            },
            keep_resources: self.provisioning.keep_resources,
        }
    }

    /// Builds registry API client settings.
    #[must_use]
    pub fn registry_api_config(&self) -> RegistryApiConfig {
        RegistryApiConfig {
            endpoint: self.management.endpoint.clone(),
            api_version: self.management.api_version.clone(),
            timeout: Duration::from_millis(self.management.timeout_ms),
            status_policy: self.management.status_policy,
        }
    }
}

/// Provisioning tool configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisioningConfig {
    /// Provisioning tool executable (`terraform` or `tofu`).
    pub tool: String,
    /// Module directory holding the registry definition.
    pub module_dir: String,
    /// Variable files passed to apply and destroy.
    pub var_files: Vec<String>,
    /// Skip destroy at the end of a run.
    pub keep_resources: bool,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            tool: DEFAULT_PROVISIONING_TOOL.to_string(),
            module_dir: ".".to_string(),
            var_files: Vec::new(),
            keep_resources: false,
        }
    }
}

impl ProvisioningConfig {
    /// Validates provisioning configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_tool("provisioning.tool", &self.tool)?;
        validate_path_string("provisioning.module_dir", &self.module_dir)?;
        for file in &self.var_files {
            validate_path_string("provisioning.var_files", file)?;
        }
        Ok(())
    }
}

/// Provisioning output names.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputsConfig {
    /// Output carrying the registry name.
    pub registry_name: String,
    /// Output carrying the resource group name.
    pub resource_group: String,
    /// Output carrying the login server host.
    pub login_server: String,
    /// Output carrying the admin password.
    pub admin_password: String,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        let names = OutputNames::default();
        Self {
            registry_name: names.registry_name,
            resource_group: names.resource_group,
            login_server: names.login_server,
            admin_password: names.admin_password,
        }
    }
}

impl OutputsConfig {
    /// Validates output names.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("outputs.registry_name", &self.registry_name)?;
        validate_identifier("outputs.resource_group", &self.resource_group)?;
        validate_identifier("outputs.login_server", &self.login_server)?;
        validate_identifier("outputs.admin_password", &self.admin_password)
    }
}

/// Identity CLI configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Identity CLI executable.
    pub tool: String,
    /// Environment variable holding the subscription id.
    pub subscription_env: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            tool: DEFAULT_IDENTITY_CLI.to_string(),
            subscription_env: DEFAULT_SUBSCRIPTION_ENV.to_string(),
        }
    }
}

impl IdentityConfig {
    /// Validates identity configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_tool("identity.tool", &self.tool)?;
        validate_identifier("identity.subscription_env", &self.subscription_env)
    }
}

/// Management API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagementConfig {
    /// Management endpoint base URL.
    pub endpoint: String,
    /// Registry resource `api-version`.
    pub api_version: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Handling of non-success HTTP status codes.
    pub status_policy: StatusPolicy,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            api_version: REGISTRY_API_VERSION.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            status_policy: StatusPolicy::Strict,
        }
    }
}

impl ManagementConfig {
    /// Validates management API configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(self.endpoint.trim()).map_err(|err| {
            ConfigError::Invalid(format!("management.endpoint is not a valid url: {err}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "management.endpoint must use http or https".to_string(),
            ));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::Invalid("management.endpoint must include a host".to_string()));
        }
        validate_non_empty("management.api_version", &self.api_version)?;
        if !(MIN_TIMEOUT_MS ..= MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "management.timeout_ms must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Container CLI and image fixture configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerConfig {
    /// Container CLI executable.
    pub tool: String,
    /// Local image to tag and push.
    pub source_image: String,
    /// Repository inside the registry.
    pub repository: String,
    /// Tag applied to the pushed image.
    pub tag: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        let settings = ScenarioSettings::default();
        Self {
            tool: DEFAULT_CONTAINER_CLI.to_string(),
            source_image: settings.source_image,
            repository: settings.repository,
            tag: settings.tag,
        }
    }
}

impl ContainerConfig {
    /// Validates container configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_tool("container.tool", &self.tool)?;
        validate_identifier("container.source_image", &self.source_image)?;
        validate_repository(&self.repository)?;
        validate_tag(&self.tag)
    }
}

/// Expected observations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpectationsConfig {
    /// Expected `publicNetworkAccess` value.
    pub public_network_access: String,
    /// Expected push result.
    pub push_succeeds: bool,
    /// Expected pull result.
    pub pull_succeeds: bool,
}

impl Default for ExpectationsConfig {
    fn default() -> Self {
        let expected = Expectations::default();
        Self {
            public_network_access: expected.public_network_access,
            push_succeeds: expected.push_succeeds,
            pull_succeeds: expected.pull_succeeds,
        }
    }
}

impl ExpectationsConfig {
    /// Validates expectations.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_non_empty("expectations.public_network_access", &self.public_network_access)
    }
}

/// Event log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSink {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `logging.path`.
    File,
    /// No event log.
    #[serde(rename = "none")]
    Disabled,
}

/// Event log configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Event log destination.
    pub sink: LogSink,
    /// Log file path (file sink only).
    pub path: Option<String>,
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (LogSink::File, Some(path)) => validate_path_string("logging.path", path),
            (LogSink::File, None) => {
                Err(ConfigError::Invalid("logging.path is required for the file sink".to_string()))
            }
            (_, Some(_)) => Err(ConfigError::Invalid(
                "logging.path is only valid with sink = \"file\"".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Missing or malformed environment input.
    #[error("config environment error: {0}")]
    Env(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path: explicit path, then [`CONFIG_ENV_VAR`], then
/// [`DEFAULT_CONFIG_NAME`].
///
/// # Errors
///
/// Returns [`ConfigError::Env`] when [`CONFIG_ENV_VAR`] is set but not UTF-8,
/// and [`ConfigError::Invalid`] when it is too long.
pub fn resolve_config_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    resolve_path(path, env::var_os(CONFIG_ENV_VAR))
}

/// Resolves the config path from CLI or environment defaults.
///
/// `env_value` is the raw value of [`CONFIG_ENV_VAR`]; a set but non-UTF-8
/// value is rejected rather than skipped.
pub(crate) fn resolve_path(
    path: Option<&Path>,
    env_value: Option<OsString>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    let Some(raw) = env_value else {
        return Ok(PathBuf::from(DEFAULT_CONFIG_NAME));
    };
    let env_path = raw
        .into_string()
        .map_err(|_| ConfigError::Env(format!("{CONFIG_ENV_VAR} must be utf-8")))?;
    if env_path.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    Ok(PathBuf::from(env_path))
}

/// Reads a config file, checking its size before reading any content.
fn read_capped(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let io_error = |err: std::io::Error| ConfigError::Io(format!("{}: {err}", path.display()));
    let file = File::open(path).map_err(io_error)?;
    let size = file.metadata().map_err(io_error)?.len();
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    let mut bytes = Vec::new();
    file.take(MAX_CONFIG_FILE_SIZE + 1).read_to_end(&mut bytes).map_err(io_error)?;
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    Ok(bytes)
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Rejects empty or whitespace-only values.
fn validate_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Rejects empty values and values containing whitespace.
fn validate_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    validate_non_empty(field, value)?;
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!("{field} must not contain whitespace")));
    }
    Ok(())
}

/// Validates an executable name or path.
fn validate_tool(field: &str, value: &str) -> Result<(), ConfigError> {
    validate_identifier(field, value)?;
    validate_path_string(field, value)
}

/// Validates a repository name (`[a-z0-9._-]` segments separated by `/`).
fn validate_repository(value: &str) -> Result<(), ConfigError> {
    let field = "container.repository";
    validate_non_empty(field, value)?;
    let valid_segment = |segment: &str| {
        !segment.is_empty()
            && segment.chars().all(|ch| {
                ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '.' | '_' | '-')
            })
    };
    if !value.split('/').all(valid_segment) {
        return Err(ConfigError::Invalid(format!(
            "{field} must be lowercase path segments of [a-z0-9._-]"
        )));
    }
    Ok(())
}

/// Validates an image tag (`[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`).
fn validate_tag(value: &str) -> Result<(), ConfigError> {
    let field = "container.tag";
    let mut chars = value.chars();
    let valid_first = chars.next().is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    let valid_rest = chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'));
    if !valid_first || !valid_rest || value.len() > MAX_TAG_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "{field} must match [A-Za-z0-9_][A-Za-z0-9_.-]{{0,{}}}",
            MAX_TAG_LENGTH - 1
        )));
    }
    Ok(())
}

/// Interprets the raw value of the subscription environment variable.
pub(crate) fn subscription_id_from(
    name: &str,
    value: Option<OsString>,
) -> Result<String, ConfigError> {
    let Some(raw) = value else {
        return Err(ConfigError::Env(format!("{name} is not set")));
    };
    let text = raw.into_string().map_err(|_| ConfigError::Env(format!("{name} must be utf-8")))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Env(format!("{name} must be non-empty")));
    }
    Ok(trimmed.to_string())
}
