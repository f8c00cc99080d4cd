// system-tests/src/lib.rs
// ============================================================================
// Module: ACR Probe System Tests Library
// Description: Shared configuration and run summaries for live scenarios.
// Purpose: Provide settings and result reporting for the live test binary.
// Dependencies: acr-probe-core, serde
// ============================================================================

//! ## Overview
//! This crate hosts the environment-backed configuration and the run summary
//! model used by the live system tests in `system-tests/tests`. Those tests
//! create real cloud resources and only build with the `system-tests` feature.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod summary;

#[cfg(test)]
mod summary_tests;
