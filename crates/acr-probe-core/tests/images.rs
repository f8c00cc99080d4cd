// crates/acr-probe-core/tests/images.rs
// ============================================================================
// Module: Image Operations Tests
// Description: Tests for the container CLI facade.
// Purpose: Verify command shapes and the per-operation failure contracts.
// Dependencies: acr-probe-core
// ============================================================================
//! ## Overview
//! Exercises [`ImageOperations`] against a scripted runner.

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

mod common;

use std::sync::Arc;

use acr_probe_core::ImageOperations;
use acr_probe_core::ProcessError;
use acr_probe_core::registry_image_reference;
use common::MemoryEventSink;
use common::ScriptedRunner;
use common::fail;
use common::ok;

// ============================================================================
// SECTION: References
// ============================================================================

/// Tests the tagged reference layout.
#[test]
fn image_reference_joins_server_repository_and_tag() {
    assert_eq!(
        registry_image_reference("acrprobe.azurecr.io", "hello-world", "1.0.1"),
        "acrprobe.azurecr.io/hello-world:1.0.1"
    );
    assert_eq!(
        registry_image_reference("acrprobe.azurecr.io/", "team/app", "latest"),
        "acrprobe.azurecr.io/team/app:latest"
    );
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Tests that tagging returns the target and fails on a non-zero exit.
#[test]
fn tag_returns_target_or_error() {
    let runner = ScriptedRunner::new();
    let images = ImageOperations::new(&runner);
    assert_eq!(images.tag_image("hello-world:latest", "r.io/hw:1").unwrap(), "r.io/hw:1");

    runner.respond("docker", &["tag"], fail(1, "No such image"));
    let err = images.tag_image("missing:latest", "r.io/hw:1").unwrap_err();
    assert!(matches!(
        err,
        ProcessError::NonZeroExit { ref stderr, .. } if stderr == "No such image"
    ));
}

/// Tests that login passes the password only as a masked argument.
#[test]
fn login_masks_password() {
    let runner = ScriptedRunner::new();
    runner.respond("docker", &["login"], fail(1, "unauthorized: authentication required"));
    let images = ImageOperations::new(&runner);
    let err = images.login("acrprobe", "s3cret", "acrprobe.azurecr.io").unwrap_err();

    assert!(!err.to_string().contains("s3cret"));
    assert_eq!(
        runner.calls()[0].arg_values(),
        vec!["login", "acrprobe.azurecr.io", "--username", "acrprobe", "--password", "s3cret"]
    );
}

/// Tests that push propagates failures.
#[test]
fn push_returns_error() {
    let runner = ScriptedRunner::new();
    runner.respond("docker", &["push"], fail(1, "denied"));
    let images = ImageOperations::new(&runner);
    assert!(images.push("r.io/hw:1").is_err());
}

/// Tests that pull collapses failure to `false` and logs the error.
#[test]
fn pull_reports_bool_and_logs_error() {
    let runner = ScriptedRunner::new();
    let events = Arc::new(MemoryEventSink::default());
    let images = ImageOperations::with_program(&runner, "podman").with_events(events.clone());
    assert!(images.pull("r.io/hw:1"));
    assert!(events.events().is_empty());

    runner.respond("podman", &["pull"], fail(1, "manifest unknown"));
    assert!(!images.pull("r.io/hw:1"));
    let recorded = events.events();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].event, "pull.error_discarded");
    assert_eq!(runner.lines()[0], "podman pull r.io/hw:1");
}

// ============================================================================
// SECTION: Local Cleanup
// ============================================================================

/// Tests that listing skips blank lines.
#[test]
fn list_skips_blank_lines() {
    let runner = ScriptedRunner::new();
    runner.respond("docker", &["images"], ok("a:1\n\n   \nb:2\n"));
    let images = ImageOperations::new(&runner);
    assert_eq!(images.list_local_images().unwrap(), vec!["a:1", "b:2"]);
}

/// Tests that every listed image is force-removed.
#[test]
fn delete_all_removes_each_image() {
    let runner = ScriptedRunner::new();
    runner.respond("docker", &["images"], ok("a:1\nb:2\n"));
    let events = Arc::new(MemoryEventSink::default());
    let images = ImageOperations::new(&runner).with_events(events.clone());

    assert_eq!(images.delete_all_local_images().unwrap(), vec!["a:1", "b:2"]);
    assert_eq!(runner.lines()[1 ..], ["docker rmi -f a:1", "docker rmi -f b:2"]);
    assert_eq!(events.names(), vec!["image.deleted", "image.deleted"]);
}

/// Tests that deletion stops at the first failure.
#[test]
fn delete_all_aborts_on_first_failure() {
    let runner = ScriptedRunner::new();
    runner.respond("docker", &["images"], ok("a:1\nb:2\nc:3\n"));
    runner.respond("docker", &["rmi", "-f", "b:2"], fail(1, "conflict"));
    let images = ImageOperations::new(&runner);

    assert!(images.delete_all_local_images().is_err());
    assert_eq!(runner.count("rmi"), 2);
}

/// Tests that an empty listing removes nothing.
#[test]
fn delete_all_with_no_images_is_noop() {
    let runner = ScriptedRunner::new();
    let images = ImageOperations::new(&runner);
    assert!(images.delete_all_local_images().unwrap().is_empty());
    assert_eq!(runner.count("rmi"), 0);
}
