// crates/acr-probe-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and `acr-probe config example`.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for `acr-probe.toml`. Every value matches the built-in
//! default except the paths, which point at a typical module layout.

/// Returns a canonical example `acr-probe.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[provisioning]
tool = "terraform"
module_dir = "infra/acr"
var_files = ["infra/acr/private.tfvars"]
keep_resources = false

[outputs]
registry_name = "acr_name"
resource_group = "resource_group_name"
login_server = "login_server"
admin_password = "acr_admin_password"

[identity]
tool = "az"
subscription_env = "TF_VAR_azure_subscription_id"

[management]
endpoint = "https://management.azure.com"
api_version = "2023-06-01-preview"
timeout_ms = 30000
status_policy = "strict"

[container]
tool = "docker"
source_image = "hello-world:latest"
repository = "hello-world"
tag = "1.0.1"

[expectations]
public_network_access = "Disabled"
push_succeeds = true
pull_succeeds = true

[logging]
sink = "file"
path = "acr-probe-events.jsonl"
"#,
    )
}
