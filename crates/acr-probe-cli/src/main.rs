// crates/acr-probe-cli/src/main.rs
// ============================================================================
// Module: ACR Probe CLI Entry Point
// Description: Command dispatcher for registry validation runs.
// Purpose: Run the validation scenario and inspect registries from a shell.
// Dependencies: clap, acr-probe-core, acr-probe-config, serde, thiserror.
// ============================================================================

//! ## Overview
//! `acr-probe run` provisions a container registry, checks its network
//! access mode, pushes and pulls an image, asserts on the observations, and
//! destroys the registry. `acr-probe inspect` reads the access mode of an
//! existing registry. `acr-probe config` validates or prints configuration.
//!
//! Exit codes: `0` every assertion passed, `1` at least one assertion failed,
//! `2` the run could not complete or cleanup failed.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use acr_probe_config::CONFIG_ENV_VAR;
use acr_probe_config::LogSink;
use acr_probe_config::ProbeConfig;
use acr_probe_config::config_toml_example;
use acr_probe_config::resolve_config_path;
use acr_probe_core::AccessTokenProvider;
use acr_probe_core::AzureCliTokenProvider;
use acr_probe_core::CleanupStatus;
use acr_probe_core::Collaborators;
use acr_probe_core::CommandRunner;
use acr_probe_core::FileEventSink;
use acr_probe_core::ImageOperations;
use acr_probe_core::NoopEventSink;
use acr_probe_core::ProbeEventSink;
use acr_probe_core::RegistryApiClient;
use acr_probe_core::ScenarioReport;
use acr_probe_core::ScenarioRun;
use acr_probe_core::StaticTokenProvider;
use acr_probe_core::StderrEventSink;
use acr_probe_core::StepRecord;
use acr_probe_core::SystemCommandRunner;
use acr_probe_core::TerraformProvisioner;
use acr_probe_core::public_network_access;
use acr_probe_core::run_scenario;
use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding a pre-issued management-API token.
const ACCESS_TOKEN_ENV: &str = "ACR_PROBE_ACCESS_TOKEN";
/// Exit code for runs where at least one assertion failed.
const EXIT_ASSERTIONS_FAILED: u8 = 1;
/// Exit code for runs that could not complete.
const EXIT_FATAL: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "acr-probe", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision a registry, validate it, and destroy it.
    Run(RunCommand),
    /// Print the network access mode of an existing registry.
    Inspect(InspectCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Config file path (defaults to `ACR_PROBE_CONFIG` or `./acr-probe.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Write a JSON run summary to this path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Leave provisioned resources in place.
    #[arg(long, action = ArgAction::SetTrue)]
    keep_resources: bool,
}

/// Arguments for `inspect`.
#[derive(Args, Debug)]
struct InspectCommand {
    /// Config file path (defaults to `ACR_PROBE_CONFIG` or `./acr-probe.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Resource group holding the registry.
    #[arg(long, value_name = "NAME")]
    resource_group: String,
    /// Registry name.
    #[arg(long, value_name = "NAME")]
    registry: String,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigValidateCommand),
    /// Print an example config file.
    Example,
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path (defaults to `ACR_PROBE_CONFIG` or `./acr-probe.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("acr-probe {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        let mut command = Cli::command();
        command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Run(command) => command_run(&command),
        Commands::Inspect(command) => command_inspect(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the full validation scenario.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let mut config = load_config(command.config.as_deref())?;
    if command.keep_resources {
        config.provisioning.keep_resources = true;
    }
    let subscription_id = config
        .subscription_id()
        .map_err(|err| CliError::new(format!("subscription lookup failed: {err}")))?;
    let events = build_event_sink(&config)?;
    let runner = SystemCommandRunner::with_events(Arc::clone(&events));
    let provisioner =
        TerraformProvisioner::new(&runner, config.module_dir(), config.var_files())
            .with_program(config.provisioning.tool.as_str());
    let tokens = select_token_provider(env::var(ACCESS_TOKEN_ENV).ok(), &runner, &config);
    let registry = RegistryApiClient::new(config.registry_api_config())
        .map_err(|err| CliError::new(format!("registry client setup failed: {err}")))?;
    let images = ImageOperations::with_program(&runner, config.container.tool.as_str())
        .with_events(Arc::clone(&events));
    let settings = config.scenario_settings(subscription_id);
    let parts = Collaborators {
        provisioner: &provisioner,
        tokens: tokens.as_ref(),
        registry: &registry,
        images: &images,
        events: events.as_ref(),
    };

    let run = run_scenario(&settings, &parts);

    if let Some(path) = &command.report {
        write_report(path, &RunSummary::from_run(&run))?;
    }
    for line in render_run(&run) {
        write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::from(exit_status(&run)))
}

/// Maps a finished run to its exit status.
fn exit_status(run: &ScenarioRun) -> u8 {
    if matches!(run.cleanup, CleanupStatus::Failed(_)) {
        return EXIT_FATAL;
    }
    match &run.outcome {
        Ok(report) if report.all_passed() => 0,
        Ok(_) => EXIT_ASSERTIONS_FAILED,
        Err(_) => EXIT_FATAL,
    }
}

/// Renders a human-readable run summary.
fn render_run(run: &ScenarioRun) -> Vec<String> {
    let mut lines = Vec::new();
    match &run.outcome {
        Ok(report) => {
            for check in &report.checks {
                if check.passed {
                    lines.push(format!("PASS  {}", check.name));
                } else {
                    lines.push(format!(
                        "FAIL  {} (expected {}, got {})",
                        check.name, check.expected, check.actual
                    ));
                }
            }
        }
        Err(err) => lines.push(format!("ERROR {}: {err}", err.step().as_str())),
    }
    lines.push(match &run.cleanup {
        CleanupStatus::Destroyed => "cleanup: resources destroyed".to_string(),
        CleanupStatus::Retained => "cleanup: resources retained".to_string(),
        CleanupStatus::Failed(message) => format!("cleanup: destroy failed: {message}"),
    });
    lines
}

/// Serializable run summary written by `--report`.
#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    /// `passed`, `assertions_failed`, or `error`.
    status: &'static str,
    /// Finished steps, in order.
    steps: &'a [StepRecord],
    /// Report, when the run reached the assertions.
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a ScenarioReport>,
    /// Fatal error text, when the run ended early.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// Cleanup result.
    cleanup: &'a CleanupStatus,
}

impl<'a> RunSummary<'a> {
    /// Builds a summary view of a run.
    fn from_run(run: &'a ScenarioRun) -> Self {
        let (status, report, error) = match &run.outcome {
            Ok(report) if report.all_passed() => ("passed", Some(report), None),
            Ok(report) => ("assertions_failed", Some(report), None),
            Err(err) => ("error", None, Some(err.to_string())),
        };
        Self {
            status,
            steps: &run.steps,
            report,
            error,
            cleanup: &run.cleanup,
        }
    }
}

/// Writes the run summary as pretty JSON.
fn write_report(path: &Path, summary: &RunSummary<'_>) -> CliResult<()> {
    let mut bytes = serde_json::to_vec_pretty(summary)
        .map_err(|err| CliError::new(format!("failed to encode report: {err}")))?;
    bytes.push(b'\n');
    fs::write(path, bytes)
        .map_err(|err| CliError::new(format!("failed to write report {}: {err}", path.display())))
}

// ============================================================================
// SECTION: Inspect Command
// ============================================================================

/// Prints the network access mode of an existing registry.
fn command_inspect(command: &InspectCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let subscription_id = config
        .subscription_id()
        .map_err(|err| CliError::new(format!("subscription lookup failed: {err}")))?;
    let runner = SystemCommandRunner::new();
    let tokens = select_token_provider(env::var(ACCESS_TOKEN_ENV).ok(), &runner, &config);
    let token = tokens
        .access_token(&subscription_id)
        .map_err(|err| CliError::new(format!("access token fetch failed: {err}")))?;
    let client = RegistryApiClient::new(config.registry_api_config())
        .map_err(|err| CliError::new(format!("registry client setup failed: {err}")))?;
    let details = client
        .get_registry_details(&token, &subscription_id, &command.resource_group, &command.registry)
        .map_err(|err| CliError::new(format!("registry details fetch failed: {err}")))?;
    write_stdout_line(&format!(
        "{}: publicNetworkAccess = {}",
        command.registry,
        public_network_access(&details)
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
        ConfigCommand::Example => {
            write_stdout_bytes(config_toml_example().as_bytes())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = ProbeConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line("config is valid")
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Wiring Helpers
// ============================================================================

/// Loads configuration, falling back to defaults when no file is configured
/// and `./acr-probe.toml` does not exist.
fn load_config(path: Option<&Path>) -> CliResult<ProbeConfig> {
    let resolved = resolve_config_path(path)
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    if path.is_none() && env::var_os(CONFIG_ENV_VAR).is_none() && !resolved.exists() {
        return Ok(ProbeConfig {
            base_dir: PathBuf::from("."),
            ..ProbeConfig::default()
        });
    }
    ProbeConfig::load(Some(&resolved))
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Builds the configured event sink.
fn build_event_sink(config: &ProbeConfig) -> CliResult<Arc<dyn ProbeEventSink>> {
    match (config.logging.sink, config.log_path()) {
        (LogSink::File, Some(path)) => {
            let sink = FileEventSink::new(&path).map_err(|err| {
                CliError::new(format!("failed to open event log {}: {err}", path.display()))
            })?;
            Ok(Arc::new(sink))
        }
        (LogSink::Disabled, _) => Ok(Arc::new(NoopEventSink)),
        _ => Ok(Arc::new(StderrEventSink)),
    }
}

/// Uses a pre-issued token when one is supplied, the identity CLI otherwise.
fn select_token_provider<'a, R: CommandRunner + 'a>(
    static_token: Option<String>,
    runner: R,
    config: &ProbeConfig,
) -> Box<dyn AccessTokenProvider + 'a> {
    match static_token.filter(|token| !token.trim().is_empty()) {
        Some(token) => Box::new(StaticTokenProvider::new(token.trim())),
        None => {
            Box::new(AzureCliTokenProvider::with_program(runner, config.identity.tool.as_str()))
        }
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message and returns the fatal exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("error: {message}"));
    ExitCode::from(EXIT_FATAL)
}
