//! Common utilities for integration tests.
//!
//! Provides helpers for:
//! - Writing executable stand-ins for the generator, compiler, and optimizer
//! - Building drivers over a scratch workspace
//! - Writing log files for triage

#![allow(dead_code)]

use optfuzz_campaign::CampaignDriver;
use optfuzz_common::config::{
    ArtifactPaths, CampaignConfig, CampaignMode, GeneratorFailurePolicy, ToolchainConfig,
    WorkspaceConfig,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Generator body printing a trivial C program.
pub const GENERATOR_OK: &str = "echo 'int main(void) { return 0; }'";

/// Compiler body creating whatever file follows `-o`.
pub const COMPILER_OK: &str =
    "while [ $# -gt 0 ]; do if [ \"$1\" = \"-o\" ]; then shift; : > \"$1\"; fi; shift; done";

/// Tool body that always succeeds without output.
pub const TOOL_OK: &str = "exit 0";

/// Write an executable shell script.
#[cfg(unix)]
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("chmod script");
    path
}

/// A scripted toolchain plus a scratch workspace for artifacts.
pub struct Harness {
    pub tools: tempfile::TempDir,
    pub work: tempfile::TempDir,
    pub toolchain: ToolchainConfig,
}

impl Harness {
    #[cfg(unix)]
    pub fn new(generator: &str, compiler: &str, optimizer: &str) -> Self {
        let tools = tempfile::tempdir().expect("tools dir");
        let toolchain = ToolchainConfig {
            generator: script(tools.path(), "generator", generator),
            compiler: script(tools.path(), "compiler", compiler),
            optimizer: script(tools.path(), "optimizer", optimizer),
            ..ToolchainConfig::default()
        };
        Self {
            tools,
            work: tempfile::tempdir().expect("work dir"),
            toolchain,
        }
    }

    pub fn artifacts(&self) -> ArtifactPaths {
        WorkspaceConfig {
            dir: self.work.path().join("run"),
            ..WorkspaceConfig::default()
        }
        .artifacts()
    }

    pub fn driver(
        &self,
        budget: Duration,
        mode: CampaignMode,
        policy: GeneratorFailurePolicy,
    ) -> CampaignDriver {
        let config = CampaignConfig::new(budget, mode, policy).expect("valid campaign config");
        CampaignDriver::new(self.toolchain.clone(), self.artifacts(), config)
    }
}

/// True when none of the artifact files exist.
pub fn artifacts_removed(artifacts: &ArtifactPaths) -> bool {
    artifacts.all().iter().all(|path| !path.exists())
}

/// Write `content` to a fresh log file and return its directory and path.
pub fn write_log(content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("log dir");
    let path = dir.path().join("batch.log");
    std::fs::write(&path, content).expect("write log");
    (dir, path)
}
