//! Campaign lifecycle tests against a scripted toolchain.

use super::common::{artifacts_removed, Harness, COMPILER_OK, GENERATOR_OK, TOOL_OK};
use optfuzz_campaign::{ArtifactGuard, ProgressSink};
use optfuzz_common::config::{CampaignMode, GeneratorFailurePolicy};
use optfuzz_common::error::{CampaignError, ToolStep};
use optfuzz_common::state::CampaignState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn pipeline(level: u8) -> CampaignMode {
    CampaignMode::Pipeline { opt_level: level }
}

#[test]
fn test_pipeline_campaign_completes_and_cleans() {
    let harness = Harness::new(GENERATOR_OK, COMPILER_OK, TOOL_OK);
    let mut driver = harness.driver(
        Duration::from_millis(300),
        pipeline(2),
        GeneratorFailurePolicy::Abort,
    );

    let summary = driver.run_campaign().expect("campaign should complete");

    assert!(summary.executed >= 1);
    assert_eq!(summary.state, CampaignState::Completed);
    assert!(!summary.interrupted);
    assert!(summary.elapsed >= Duration::from_millis(300));
    assert_eq!(summary.metrics.count(), summary.executed);
    assert!(artifacts_removed(driver.artifacts()));
}

#[test]
fn test_single_pass_campaign_completes() {
    let harness = Harness::new(GENERATOR_OK, COMPILER_OK, TOOL_OK);
    let mut driver = harness.driver(
        Duration::from_millis(200),
        CampaignMode::SinglePass {
            pass_name: "instcombine".to_string(),
        },
        GeneratorFailurePolicy::Abort,
    );

    let summary = driver.run_campaign().expect("campaign should complete");
    assert!(summary.executed >= 1);
    assert!(artifacts_removed(driver.artifacts()));
}

#[test]
fn test_crash_aborts_with_stderr_and_cleans() {
    let harness = Harness::new(
        GENERATOR_OK,
        "echo 'Assertion failed: isa<X>(V)' >&2; exit 134",
        TOOL_OK,
    );
    let mut driver = harness.driver(
        Duration::from_secs(30),
        pipeline(3),
        GeneratorFailurePolicy::Abort,
    );

    let err = driver.run_campaign().expect_err("compiler crash aborts");

    match err {
        CampaignError::Toolchain {
            step,
            status,
            stderr,
        } => {
            assert_eq!(step, ToolStep::Compile);
            assert_eq!(status, Some(134));
            assert!(stderr.contains("Assertion failed"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(driver.state(), CampaignState::Aborted);
    assert!(artifacts_removed(driver.artifacts()));
}

#[test]
fn test_optimizer_crash_reports_optimize_step() {
    let harness = Harness::new(GENERATOR_OK, COMPILER_OK, "exit 1");
    let mut driver = harness.driver(
        Duration::from_secs(30),
        CampaignMode::SinglePass {
            pass_name: "gvn".to_string(),
        },
        GeneratorFailurePolicy::Abort,
    );

    let err = driver.run_campaign().expect_err("optimizer failure aborts");
    assert_eq!(err.step(), Some(ToolStep::Optimize));
    assert!(artifacts_removed(driver.artifacts()));
}

#[test]
fn test_generator_failure_skip_keeps_running() {
    let harness = Harness::new("exit 1", COMPILER_OK, TOOL_OK);
    let mut driver = harness.driver(
        Duration::from_millis(150),
        pipeline(3),
        GeneratorFailurePolicy::Skip,
    );

    let summary = driver.run_campaign().expect("skipped failures do not abort");
    assert_eq!(summary.executed, 0);
    assert!(summary.generator_failures >= 1);
    assert_eq!(summary.state, CampaignState::Completed);
}

#[test]
fn test_stop_flag_interrupts_campaign() {
    let harness = Harness::new(GENERATOR_OK, &format!("sleep 0.05; {COMPILER_OK}"), TOOL_OK);
    let stop = Arc::new(AtomicBool::new(false));
    let mut driver = harness
        .driver(
            Duration::from_secs(30),
            pipeline(3),
            GeneratorFailurePolicy::Abort,
        )
        .with_stop_flag(Arc::clone(&stop));

    let setter = {
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            stop.store(true, Ordering::Relaxed);
        })
    };

    let summary = driver.run_campaign().expect("interrupted campaign completes");
    setter.join().unwrap();

    assert!(summary.interrupted);
    assert!(summary.elapsed < Duration::from_secs(30));
    assert_eq!(summary.state, CampaignState::Completed);
    assert!(artifacts_removed(driver.artifacts()));
}

#[test]
fn test_progress_sink_sees_final_count() {
    #[derive(Default)]
    struct Last {
        finished: Option<u64>,
    }
    struct Recorder(Arc<Mutex<Last>>);
    impl ProgressSink for Recorder {
        fn update(&mut self, _elapsed: Duration, _budget: Duration, _executed: u64) {}
        fn finish(&mut self, _elapsed: Duration, _budget: Duration, executed: u64) {
            self.0.lock().unwrap().finished = Some(executed);
        }
    }

    let harness = Harness::new(GENERATOR_OK, COMPILER_OK, TOOL_OK);
    let last = Arc::new(Mutex::new(Last::default()));
    let mut driver = harness
        .driver(
            Duration::from_millis(150),
            pipeline(0),
            GeneratorFailurePolicy::Abort,
        )
        .with_progress(Box::new(Recorder(Arc::clone(&last))));

    let summary = driver.run_campaign().unwrap();
    assert_eq!(last.lock().unwrap().finished, Some(summary.executed));
}

#[test]
fn test_guard_cleans_after_panic() {
    let harness = Harness::new(GENERATOR_OK, COMPILER_OK, TOOL_OK);
    let artifacts = harness.artifacts();
    std::fs::create_dir_all(artifacts.source.parent().unwrap()).unwrap();
    for path in artifacts.all() {
        std::fs::write(path, "stale").unwrap();
    }

    let paths = artifacts.clone();
    let result = std::panic::catch_unwind(move || {
        let _guard = ArtifactGuard::new(paths);
        panic!("iteration blew up");
    });

    assert!(result.is_err());
    assert!(artifacts_removed(&artifacts));
}
