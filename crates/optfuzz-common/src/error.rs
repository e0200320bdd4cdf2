use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// External tool invoked during one campaign iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolStep {
    /// Random program generator writing the source file.
    Generate,
    /// Compiler building a native binary through the optimization pipeline.
    Compile,
    /// Compiler front end emitting textual IR without optimization.
    EmitIr,
    /// Optimizer running the normalization pass and the pass under test.
    Optimize,
}

impl fmt::Display for ToolStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Compile => write!(f, "compile"),
            Self::EmitIr => write!(f, "emit-ir"),
            Self::Optimize => write!(f, "optimize"),
        }
    }
}

/// Errors that end a fuzz campaign.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// Compiler or optimizer exited unsuccessfully.
    #[error("{step} step failed with {}: {stderr}", describe_status(.status))]
    Toolchain {
        /// Step that failed.
        step: ToolStep,
        /// Exit code, `None` when the process was killed by a signal.
        status: Option<i32>,
        /// Tail of the captured standard error.
        stderr: String,
    },

    /// Program generator exited unsuccessfully.
    #[error("generator failed with {}: {stderr}", describe_status(.status))]
    Generator {
        /// Exit code, `None` when the process was killed by a signal.
        status: Option<i32>,
        /// Tail of the captured standard error.
        stderr: String,
    },

    /// External program could not be started at all.
    #[error("failed to spawn {program} for {step} step: {source}")]
    Spawn {
        /// Step being executed.
        step: ToolStep,
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error on a transient artifact.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid campaign state transition attempted.
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Source state.
        from: String,
        /// Attempted target state.
        to: String,
    },
}

impl CampaignError {
    /// Step that caused the failure, if the error came from an external tool.
    #[must_use]
    pub fn step(&self) -> Option<ToolStep> {
        match self {
            Self::Toolchain { step, .. } | Self::Spawn { step, .. } => Some(*step),
            Self::Generator { .. } => Some(ToolStep::Generate),
            Self::Io { .. } | Self::InvalidTransition { .. } => None,
        }
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}

/// Convenience type alias for campaign operations.
pub type CampaignResult<T> = Result<T, CampaignError>;

/// Errors raised by the log triage reducer.
#[derive(Debug, Error)]
pub enum TriageError {
    /// A `fail: ` line carried no `Construct: <n>` identifier.
    #[error("fail line has no construct identifier: {line:?}")]
    MalformedFailLine {
        /// The offending raw line.
        line: String,
    },

    /// Log file exists but could not be read.
    #[error("failed to read log file {path}: {source}")]
    Io {
        /// Path to the log file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
