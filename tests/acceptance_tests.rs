//! Acceptance tests for optfuzz.
//!
//! These tests drive whole campaigns and triage runs end to end:
//! - Campaign lifecycle against a scripted stand-in toolchain
//! - Artifact cleanup on every exit path
//! - Triage reports from realistic batch logs
//!
//! Campaign tests need a Unix shell (`/bin/sh`) and are skipped elsewhere.

mod acceptance;
