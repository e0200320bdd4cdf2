//! Configuration structures for fuzz campaigns.
//!
//! Supports TOML deserialization with defaults that match a stock
//! csmith + clang + opt installation on `PATH`. Tool locations and
//! artifact names are carried explicitly so separate campaigns can
//! work in separate directories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Highest optimization level accepted for pipeline mode.
pub const MAX_OPT_LEVEL: u8 = 3;

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    /// External tool locations and flags.
    pub toolchain: ToolchainConfig,

    /// Where transient artifacts are written.
    pub workspace: WorkspaceConfig,

    /// Campaign defaults, overridable from the command line.
    pub campaign: CampaignSettings,
}

/// External toolchain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Random program generator; its stdout becomes the source file.
    pub generator: PathBuf,

    /// Extra arguments for the generator.
    pub generator_args: Vec<String>,

    /// Compiler driver (front end plus optimization pipeline).
    pub compiler: PathBuf,

    /// Standalone optimizer used in single-pass mode.
    pub optimizer: PathBuf,

    /// Include directories passed to the compiler as `-I<dir>`.
    /// Usually the generator's runtime header directory.
    pub include_dirs: Vec<PathBuf>,

    /// Flags passed to every compiler invocation.
    pub compiler_flags: Vec<String>,

    /// Pass always run ahead of the pass under test.
    pub normalization_pass: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            generator: PathBuf::from("csmith"),
            generator_args: Vec::new(),
            compiler: PathBuf::from("clang"),
            optimizer: PathBuf::from("opt"),
            include_dirs: Vec::new(),
            compiler_flags: vec![String::from("-Wno-everything")],
            normalization_pass: String::from("mem2reg"),
        }
    }
}

/// Transient artifact locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory holding the artifacts.
    pub dir: PathBuf,

    /// Generated source file name.
    pub source_name: String,

    /// Intermediate representation file name.
    pub ir_name: String,

    /// Compiled binary file name.
    pub binary_name: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            source_name: String::from("random.c"),
            ir_name: String::from("random.ll"),
            binary_name: String::from("random"),
        }
    }
}

impl WorkspaceConfig {
    /// Resolve the three artifact paths inside [`WorkspaceConfig::dir`].
    #[must_use]
    pub fn artifacts(&self) -> ArtifactPaths {
        ArtifactPaths {
            source: self.dir.join(&self.source_name),
            ir: self.dir.join(&self.ir_name),
            binary: self.dir.join(&self.binary_name),
        }
    }
}

/// Resolved paths of the files a campaign overwrites every iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Generated program.
    pub source: PathBuf,
    /// Textual IR (single-pass mode).
    pub ir: PathBuf,
    /// Native binary (pipeline mode).
    pub binary: PathBuf,
}

impl ArtifactPaths {
    /// All artifact paths.
    #[must_use]
    pub fn all(&self) -> [&Path; 3] {
        [&self.source, &self.ir, &self.binary]
    }
}

/// What the driver does when the program generator fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorFailurePolicy {
    /// Stop the campaign, like a compiler failure.
    #[default]
    Abort,
    /// Skip compilation for this iteration and move on.
    Skip,
    /// Re-run the generator in place before giving up.
    Retry {
        /// Extra attempts after the first failure.
        attempts: u32,
    },
}

impl fmt::Display for GeneratorFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => write!(f, "abort"),
            Self::Skip => write!(f, "skip"),
            Self::Retry { attempts } => write!(f, "retry({attempts})"),
        }
    }
}

/// Campaign defaults as read from the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignSettings {
    /// Wall-clock budget for the whole campaign.
    #[serde(with = "humantime_serde")]
    pub time_budget: Duration,

    /// Optimization level for pipeline mode.
    pub opt_level: u8,

    /// Pass under test; selects single-pass mode when set.
    pub single_pass: Option<String>,

    /// Generator failure handling.
    pub on_generator_failure: GeneratorFailurePolicy,
}

impl Default for CampaignSettings {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(60),
            opt_level: 3,
            single_pass: None,
            on_generator_failure: GeneratorFailurePolicy::Abort,
        }
    }
}

/// How each iteration exercises the toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignMode {
    /// Full optimization pipeline at one level, producing a binary.
    Pipeline {
        /// Level passed as `-O<n>`.
        opt_level: u8,
    },
    /// Normalization pass followed by one named pass, output discarded.
    SinglePass {
        /// Name of the pass under test.
        pass_name: String,
    },
}

impl fmt::Display for CampaignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pipeline { opt_level } => write!(f, "pipeline -O{opt_level}"),
            Self::SinglePass { pass_name } => write!(f, "single pass {pass_name}"),
        }
    }
}

/// Validated, immutable parameters of one campaign run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignConfig {
    /// Wall-clock budget; no iteration starts once it is spent.
    pub time_budget: Duration,
    /// Toolchain exercise mode.
    pub mode: CampaignMode,
    /// Generator failure handling.
    pub on_generator_failure: GeneratorFailurePolicy,
}

impl CampaignConfig {
    /// Build and validate a campaign configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an optimization level above
    /// [`MAX_OPT_LEVEL`] or an empty or comma-containing pass name.
    pub fn new(
        time_budget: Duration,
        mode: CampaignMode,
        on_generator_failure: GeneratorFailurePolicy,
    ) -> Result<Self, ConfigError> {
        match &mode {
            CampaignMode::Pipeline { opt_level } if *opt_level > MAX_OPT_LEVEL => {
                return Err(ConfigError::Invalid(format!(
                    "optimization level {opt_level} out of range 0..={MAX_OPT_LEVEL}"
                )));
            }
            CampaignMode::SinglePass { pass_name } if pass_name.trim().is_empty() => {
                return Err(ConfigError::Invalid(String::from("pass name is empty")));
            }
            // The optimizer takes a comma separated pipeline
            CampaignMode::SinglePass { pass_name } if pass_name.contains(',') => {
                return Err(ConfigError::Invalid(format!(
                    "pass name {pass_name:?} must name exactly one pass"
                )));
            }
            _ => {}
        }

        Ok(Self {
            time_budget,
            mode,
            on_generator_failure,
        })
    }
}

impl CampaignSettings {
    /// Derive a validated [`CampaignConfig`] from these settings.
    ///
    /// # Errors
    ///
    /// See [`CampaignConfig::new`].
    pub fn to_campaign_config(&self) -> Result<CampaignConfig, ConfigError> {
        let mode = match &self.single_pass {
            Some(pass_name) => CampaignMode::SinglePass {
                pass_name: pass_name.clone(),
            },
            None => CampaignMode::Pipeline {
                opt_level: self.opt_level,
            },
        };
        CampaignConfig::new(self.time_budget, mode, self.on_generator_failure)
    }
}

impl FuzzConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Semantically invalid value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
