// crates/acr-probe-config/src/lib.rs
// ============================================================================
// Module: ACR Probe Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for acr-probe.toml semantics.
// Dependencies: acr-probe-core, serde, toml, url
// ============================================================================

//! ## Overview
//! `acr-probe-config` defines the `acr-probe.toml` model. Loading is strict
//! and fail-closed: unknown keys, oversized files, and invalid values are
//! rejected before any external tool runs. Defaults reproduce the standard
//! private-registry fixture.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
