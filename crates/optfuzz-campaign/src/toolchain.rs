//! Command lines for the external toolchain.

use crate::process::{Invocation, StdoutTarget};
use optfuzz_common::config::{ArtifactPaths, ToolchainConfig};
use optfuzz_common::error::ToolStep;

/// Builds generator, compiler, and optimizer invocations from configuration.
#[derive(Debug, Clone)]
pub struct Toolchain {
    config: ToolchainConfig,
}

impl Toolchain {
    /// Wrap a toolchain configuration.
    #[must_use]
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    /// Underlying configuration.
    #[must_use]
    pub fn config(&self) -> &ToolchainConfig {
        &self.config
    }

    /// Generator writing a fresh program over the source artifact.
    #[must_use]
    pub fn generate(&self, artifacts: &ArtifactPaths) -> Invocation {
        Invocation::new(ToolStep::Generate, &self.config.generator)
            .args(&self.config.generator_args)
            .stdout(StdoutTarget::File(artifacts.source.clone()))
    }

    /// Compiler building a binary at `-O<opt_level>`.
    #[must_use]
    pub fn compile(&self, artifacts: &ArtifactPaths, opt_level: u8) -> Invocation {
        self.compiler_base(ToolStep::Compile, artifacts)
            .arg(format!("-O{opt_level}"))
            .arg("-o")
            .arg(&artifacts.binary)
    }

    /// Compiler front end emitting unoptimized textual IR.
    #[must_use]
    pub fn emit_ir(&self, artifacts: &ArtifactPaths) -> Invocation {
        self.compiler_base(ToolStep::EmitIr, artifacts)
            .args(["-S", "-emit-llvm", "-o"])
            .arg(&artifacts.ir)
    }

    /// Optimizer running the normalization pass then `pass_name`, output discarded.
    #[must_use]
    pub fn optimize(&self, artifacts: &ArtifactPaths, pass_name: &str) -> Invocation {
        Invocation::new(ToolStep::Optimize, &self.config.optimizer)
            .arg("-S")
            .arg(format!(
                "-passes={},{pass_name}",
                self.config.normalization_pass
            ))
            .arg(&artifacts.ir)
            .arg("--disable-output")
    }

    fn compiler_base(&self, step: ToolStep, artifacts: &ArtifactPaths) -> Invocation {
        let includes = self.config.include_dirs.iter().map(|dir| {
            let mut flag = std::ffi::OsString::from("-I");
            flag.push(dir);
            flag
        });

        Invocation::new(step, &self.config.compiler)
            .arg(&artifacts.source)
            .args(&self.config.compiler_flags)
            .args(includes)
    }
}
