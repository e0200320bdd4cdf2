//! The time-boxed campaign loop.
//!
//! Iterations run strictly one after another and each blocks on its
//! external tools. The time budget and the stop flag are only checked
//! between iterations, so a hung tool stalls the whole campaign.

use crate::artifacts::{remove_artifacts, ArtifactGuard};
use crate::process::invoke;
use crate::progress::{NoProgress, ProgressSink};
use crate::toolchain::Toolchain;
use optfuzz_common::config::{
    ArtifactPaths, CampaignConfig, CampaignMode, GeneratorFailurePolicy, ToolchainConfig,
};
use optfuzz_common::error::{CampaignError, CampaignResult};
use optfuzz_common::metrics::IterationMetrics;
use optfuzz_common::state::CampaignState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of a campaign that ran to its end.
#[derive(Debug, Clone)]
pub struct CampaignSummary {
    /// Iterations whose compilation steps all succeeded.
    pub executed: u64,
    /// Generator invocations that exited unsuccessfully.
    pub generator_failures: u64,
    /// Wall-clock time spent in the loop.
    pub elapsed: Duration,
    /// Final state, always [`CampaignState::Completed`] for a returned summary.
    pub state: CampaignState,
    /// True when the stop flag ended the loop before the budget was spent.
    pub interrupted: bool,
    /// Per-iteration latency statistics.
    pub metrics: IterationMetrics,
}

/// Counters that survive from one iteration to the next.
#[derive(Debug, Default)]
struct Tally {
    executed: u64,
    generator_failures: u64,
    interrupted: bool,
    metrics: IterationMetrics,
}

/// Drives one fuzz campaign.
pub struct CampaignDriver {
    toolchain: Toolchain,
    artifacts: ArtifactPaths,
    config: CampaignConfig,
    progress: Box<dyn ProgressSink>,
    stop_flag: Option<Arc<AtomicBool>>,
    state: CampaignState,
}

impl CampaignDriver {
    /// Create a driver in the `IDLE` state with progress output disabled.
    #[must_use]
    pub fn new(toolchain: ToolchainConfig, artifacts: ArtifactPaths, config: CampaignConfig) -> Self {
        Self {
            toolchain: Toolchain::new(toolchain),
            artifacts,
            config,
            progress: Box::new(NoProgress),
            stop_flag: None,
            state: CampaignState::Idle,
        }
    }

    /// Report progress to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Stop before the next iteration once `flag` is set.
    #[must_use]
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CampaignState {
        self.state
    }

    /// Artifact paths this driver writes.
    #[must_use]
    pub fn artifacts(&self) -> &ArtifactPaths {
        &self.artifacts
    }

    /// Remove the transient artifacts. Missing files are ignored.
    pub fn cleanup(&self) {
        let removed = remove_artifacts(&self.artifacts);
        debug!(removed, "Artifacts cleaned up");
    }

    /// Run the campaign until the time budget is spent.
    ///
    /// Artifacts are removed on every exit path.
    ///
    /// # Errors
    ///
    /// Returns the first toolchain failure (fail-fast), a generator failure
    /// when the policy does not absorb it, a spawn or I/O error, or
    /// [`CampaignError::InvalidTransition`] if the driver was already run.
    pub fn run_campaign(&mut self) -> CampaignResult<CampaignSummary> {
        self.state.transition_to(CampaignState::Running)?;
        let _guard = ArtifactGuard::new(self.artifacts.clone());

        info!(
            mode = %self.config.mode,
            budget_secs = self.config.time_budget.as_secs_f64(),
            on_generator_failure = %self.config.on_generator_failure,
            "Campaign started"
        );

        let mut tally = Tally::default();
        let start = Instant::now();
        let result = self.iterate(start, &mut tally);
        let elapsed = start.elapsed();
        self.progress
            .finish(elapsed, self.config.time_budget, tally.executed);

        match result {
            Ok(()) => {
                self.state.transition_to(CampaignState::Completed)?;
                info!(
                    executed = tally.executed,
                    generator_failures = tally.generator_failures,
                    elapsed_secs = elapsed.as_secs_f64(),
                    mean_ms = tally.metrics.mean().map_or(0, |d| d.as_millis()),
                    max_ms = tally.metrics.max().map_or(0, |d| d.as_millis()),
                    throughput = tally.metrics.throughput(elapsed),
                    interrupted = tally.interrupted,
                    "Campaign completed"
                );
                Ok(CampaignSummary {
                    executed: tally.executed,
                    generator_failures: tally.generator_failures,
                    elapsed,
                    state: self.state,
                    interrupted: tally.interrupted,
                    metrics: tally.metrics,
                })
            }
            Err(e) => {
                self.state.transition_to(CampaignState::Aborted)?;
                error!(
                    error = %e,
                    executed = tally.executed,
                    elapsed_secs = elapsed.as_secs_f64(),
                    "Campaign aborted"
                );
                Err(e)
            }
        }
    }

    fn iterate(&mut self, start: Instant, tally: &mut Tally) -> CampaignResult<()> {
        let budget = self.config.time_budget;

        if let Some(dir) = self.artifacts.source.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|source| CampaignError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
        }

        let mut elapsed = start.elapsed();
        self.progress.update(elapsed, budget, tally.executed);

        while elapsed < budget {
            if self.stop_requested() {
                info!(executed = tally.executed, "Stop requested, ending campaign");
                tally.interrupted = true;
                break;
            }

            let iteration_start = Instant::now();
            match self.run_iteration(tally) {
                Ok(true) => {
                    tally.executed += 1;
                    tally.metrics.record(iteration_start.elapsed());
                }
                Ok(false) => {}
                // An interrupt also reaches the child tools in our process group
                Err(e) if self.stop_requested() => {
                    info!(error = %e, "Iteration interrupted by stop request");
                    tally.interrupted = true;
                    break;
                }
                Err(e) => return Err(e),
            }

            elapsed = start.elapsed();
            self.progress.update(elapsed, budget, tally.executed);
        }

        Ok(())
    }

    /// One generate-then-compile round. Returns false when skipped.
    fn run_iteration(&self, tally: &mut Tally) -> CampaignResult<bool> {
        if !self.generate(tally)? {
            return Ok(false);
        }
        self.exercise()?;
        Ok(true)
    }

    fn stop_requested(&self) -> bool {
        self.stop_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Produce a fresh source file. Returns false when the iteration should
    /// be skipped.
    fn generate(&self, tally: &mut Tally) -> CampaignResult<bool> {
        let policy = self.config.on_generator_failure;
        let attempts = match policy {
            GeneratorFailurePolicy::Retry { attempts } => attempts.saturating_add(1),
            GeneratorFailurePolicy::Abort | GeneratorFailurePolicy::Skip => 1,
        };

        let invocation = self.toolchain.generate(&self.artifacts);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = invoke(&invocation)?;
            if outcome.success() {
                return Ok(true);
            }

            tally.generator_failures += 1;
            warn!(
                attempt,
                status = ?outcome.status,
                stderr = %outcome.stderr,
                "Generator failed"
            );

            if attempt >= attempts {
                return match policy {
                    GeneratorFailurePolicy::Skip => Ok(false),
                    GeneratorFailurePolicy::Abort | GeneratorFailurePolicy::Retry { .. } => {
                        Err(outcome.into_error())
                    }
                };
            }
        }
    }

    /// Push the current source file through the configured toolchain steps.
    fn exercise(&self) -> CampaignResult<()> {
        match &self.config.mode {
            CampaignMode::Pipeline { opt_level } => {
                invoke(&self.toolchain.compile(&self.artifacts, *opt_level))?.into_result()?;
            }
            CampaignMode::SinglePass { pass_name } => {
                invoke(&self.toolchain.emit_ir(&self.artifacts))?.into_result()?;
                invoke(&self.toolchain.optimize(&self.artifacts, pass_name))?.into_result()?;
            }
        }
        Ok(())
    }
}
