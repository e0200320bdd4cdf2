//! Integration tests for optfuzz acceptance testing.

mod common;
#[cfg(unix)]
mod campaign_test;
mod triage_test;
