// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for live system-tests.
// Purpose: Provide per-run artifact directories and summary writing.
// Dependencies: system-tests, serde, serde_jcs
// ============================================================================

//! ## Overview
//! Shared helpers for live system-tests.

pub mod artifacts;
