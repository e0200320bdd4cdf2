//! External tool invocation.
//!
//! Every generator, compiler, and optimizer call goes through [`invoke`],
//! which blocks until the process exits and always yields an explicit
//! [`ToolOutcome`]. Nothing here interprets the tool's output; callers
//! turn unsuccessful outcomes into errors with [`ToolOutcome::into_result`].

use optfuzz_common::error::{CampaignError, CampaignResult, ToolStep};
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

/// Bytes of standard error kept for error reports.
const STDERR_TAIL_BYTES: usize = 4096;

/// Where the standard output of a tool goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdoutTarget {
    /// Keep it in [`ToolOutcome::stdout`].
    Capture,
    /// Truncate and write this file.
    File(PathBuf),
    /// Discard.
    Null,
}

/// One external program call.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Step this call performs.
    pub step: ToolStep,
    /// Program to run, looked up on `PATH` when not a path.
    pub program: PathBuf,
    /// Arguments in order.
    pub args: Vec<OsString>,
    /// Standard output routing.
    pub stdout: StdoutTarget,
}

impl Invocation {
    /// Create an invocation with no arguments and discarded output.
    pub fn new(step: ToolStep, program: impl Into<PathBuf>) -> Self {
        Self {
            step,
            program: program.into(),
            args: Vec::new(),
            stdout: StdoutTarget::Null,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Route standard output.
    #[must_use]
    pub fn stdout(mut self, target: StdoutTarget) -> Self {
        self.stdout = target;
        self
    }

    /// Arguments as lossy strings, for logs and assertions.
    #[must_use]
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Result of a finished external program.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// Step that was executed.
    pub step: ToolStep,
    /// Exit code, `None` when terminated by a signal.
    pub status: Option<i32>,
    /// Captured stdout (only with [`StdoutTarget::Capture`]).
    pub stdout: String,
    /// Tail of the captured stderr.
    pub stderr: String,
    /// Wall-clock time of the call.
    pub duration: Duration,
}

impl ToolOutcome {
    /// Whether the tool exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Convert an unsuccessful outcome into the matching campaign error.
    #[must_use]
    pub fn into_error(self) -> CampaignError {
        match self.step {
            ToolStep::Generate => CampaignError::Generator {
                status: self.status,
                stderr: self.stderr,
            },
            step => CampaignError::Toolchain {
                step,
                status: self.status,
                stderr: self.stderr,
            },
        }
    }

    /// `Ok(self)` on success, the classified error otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::Generator`] for the generate step and
    /// [`CampaignError::Toolchain`] for every other step.
    pub fn into_result(self) -> CampaignResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }
}

/// Run an external program to completion.
///
/// There is no timeout: a tool that never exits stalls the caller.
///
/// # Errors
///
/// Returns [`CampaignError::Io`] if the stdout file cannot be created and
/// [`CampaignError::Spawn`] if the program cannot be started. A non-zero
/// exit is *not* an error here; inspect the returned outcome.
pub fn invoke(invocation: &Invocation) -> CampaignResult<ToolOutcome> {
    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stderr(Stdio::piped());

    match &invocation.stdout {
        StdoutTarget::Capture => {
            command.stdout(Stdio::piped());
        }
        StdoutTarget::File(path) => {
            command.stdout(Stdio::from(create_truncated(path)?));
        }
        StdoutTarget::Null => {
            command.stdout(Stdio::null());
        }
    }

    let start = Instant::now();
    let output = command.output().map_err(|source| CampaignError::Spawn {
        step: invocation.step,
        program: invocation.program.clone(),
        source,
    })?;
    let duration = start.elapsed();

    let outcome = ToolOutcome {
        step: invocation.step,
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: stderr_tail(&output.stderr),
        duration,
    };

    debug!(
        step = %invocation.step,
        program = %invocation.program.display(),
        args = ?invocation.args_lossy(),
        status = ?outcome.status,
        duration_ms = duration.as_millis(),
        "Tool finished"
    );

    Ok(outcome)
}

fn create_truncated(path: &Path) -> CampaignResult<File> {
    File::create(path).map_err(|source| CampaignError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn stderr_tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&bytes[start..]).trim_end().to_string()
}
