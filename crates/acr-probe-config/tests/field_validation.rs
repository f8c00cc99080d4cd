//! Config field validation tests for acr-probe-config.
// crates/acr-probe-config/tests/field_validation.rs
// =============================================================================
// Module: Config Field Validation Tests
// Description: Validate per-section rules and conversions into core settings.
// Purpose: Ensure invalid values are rejected before any tool runs.
// =============================================================================

#![allow(
    clippy::use_debug,
    clippy::missing_docs_in_private_items,
    reason = "Test-only diagnostics and helpers are permitted."
)]

use std::path::Path;
use std::time::Duration;

use acr_probe_config::ProbeConfig;
use acr_probe_config::config_toml_example;
use acr_probe_core::StatusPolicy;

type TestResult = Result<(), String>;

fn parse(content: &str) -> Result<ProbeConfig, String> {
    ProbeConfig::from_toml_str(content, Path::new("/srv/probe")).map_err(|err| err.to_string())
}

fn assert_rejected(content: &str, needle: &str) -> TestResult {
    match parse(content) {
        Err(message) if message.contains(needle) => Ok(()),
        Err(message) => Err(format!("error {message} did not contain {needle}")),
        Ok(_) => Err(format!("config accepted: {content}")),
    }
}

#[test]
fn example_config_is_valid() -> TestResult {
    let config = parse(&config_toml_example())?;
    if config.module_dir() != Path::new("/srv/probe/infra/acr") {
        return Err("example module dir not resolved".to_string());
    }
    Ok(())
}

#[test]
fn tools_must_be_single_tokens() -> TestResult {
    assert_rejected("[provisioning]\ntool = \"\"\n", "provisioning.tool must be non-empty")?;
    assert_rejected("[container]\ntool = \"docker --debug\"\n", "container.tool")?;
    assert_rejected("[identity]\ntool = \" \"\n", "identity.tool")
}

#[test]
fn output_names_must_be_non_empty() -> TestResult {
    assert_rejected("[outputs]\nlogin_server = \"\"\n", "outputs.login_server")
}

#[test]
fn var_files_must_be_non_empty_paths() -> TestResult {
    assert_rejected("[provisioning]\nvar_files = [\"a.tfvars\", \"\"]\n", "provisioning.var_files")
}

#[test]
fn endpoint_must_be_http_url() -> TestResult {
    assert_rejected("[management]\nendpoint = \"management.azure.com\"\n", "management.endpoint")?;
    assert_rejected("[management]\nendpoint = \"ftp://management.azure.com\"\n", "http or https")
}

#[test]
fn timeout_must_be_in_range() -> TestResult {
    assert_rejected("[management]\ntimeout_ms = 10\n", "management.timeout_ms")?;
    assert_rejected("[management]\ntimeout_ms = 900000\n", "management.timeout_ms")
}

#[test]
fn status_policy_accepts_known_values_only() -> TestResult {
    let config = parse("[management]\nstatus_policy = \"lenient\"\n")?;
    if config.registry_api_config().status_policy != StatusPolicy::Lenient {
        return Err("lenient policy not applied".to_string());
    }
    assert_rejected("[management]\nstatus_policy = \"sometimes\"\n", "config parse error")
}

#[test]
fn repository_and_tag_follow_registry_grammar() -> TestResult {
    assert_rejected("[container]\nrepository = \"Hello-World\"\n", "container.repository")?;
    assert_rejected("[container]\nrepository = \"team//app\"\n", "container.repository")?;
    assert_rejected("[container]\ntag = \".hidden\"\n", "container.tag")?;
    assert_rejected("[container]\ntag = \"1.0 beta\"\n", "container.tag")?;
    let long_tag = format!("[container]\ntag = \"{}\"\n", "a".repeat(129));
    assert_rejected(&long_tag, "container.tag")?;
    parse("[container]\nrepository = \"team/app\"\ntag = \"v1.2_rc-3\"\n").map(|_| ())
}

#[test]
fn logging_path_requires_file_sink() -> TestResult {
    assert_rejected("[logging]\nsink = \"file\"\n", "logging.path is required")?;
    assert_rejected("[logging]\nsink = \"stderr\"\npath = \"x.jsonl\"\n", "only valid")?;
    let config = parse("[logging]\nsink = \"none\"\n")?;
    if config.log_path().is_some() {
        return Err("disabled sink should have no path".to_string());
    }
    Ok(())
}

#[test]
fn conversions_carry_every_setting() -> TestResult {
    let config = parse(
        "[provisioning]\nkeep_resources = true\n\n[outputs]\nregistry_name = \"name\"\n\n\
         [management]\nendpoint = \"http://127.0.0.1:9000\"\ntimeout_ms = 5000\n\n\
         [container]\nrepository = \"probe\"\ntag = \"2\"\n\n\
         [expectations]\npublic_network_access = \"Enabled\"\npush_succeeds = false\n",
    )?;
    let settings = config.scenario_settings("sub-1".to_string());
    if settings.subscription_id != "sub-1"
        || !settings.keep_resources
        || settings.outputs.registry_name != "name"
        || settings.outputs.login_server != "login_server"
        || settings.repository != "probe"
        || settings.tag != "2"
        || settings.source_image != "hello-world:latest"
        || settings.expectations.public_network_access != "Enabled"
        || settings.expectations.push_succeeds
        || !settings.expectations.pull_succeeds
    {
        return Err(format!("unexpected settings: {settings:?}"));
    }
    let api = config.registry_api_config();
    if api.endpoint != "http://127.0.0.1:9000"
        || api.timeout != Duration::from_secs(5)
        || api.status_policy != StatusPolicy::Strict
    {
        return Err(format!("unexpected api config: {api:?}"));
    }
    Ok(())
}

#[test]
fn unset_subscription_env_is_reported() -> TestResult {
    let name = "ACR_PROBE_TEST_SUBSCRIPTION_NEVER_SET";
    let config = parse(&format!("[identity]\nsubscription_env = \"{name}\"\n"))?;
    match config.subscription_id() {
        Err(err) if err.to_string().contains(&format!("{name} is not set")) => Ok(()),
        other => Err(format!("unexpected result: {other:?}")),
    }
}
