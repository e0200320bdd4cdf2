//! optfuzz entry point.
//!
//! `optfuzz fuzz` runs a time-boxed campaign of generated programs against
//! the compiler, `optfuzz triage` reduces a batch log to a verdict report.

mod signals;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use optfuzz_campaign::{CampaignDriver, NoProgress, ProgressSink, TerminalProgress};
use optfuzz_common::config::{FuzzConfig, GeneratorFailurePolicy};
use optfuzz_triage::{ColorMode, Dialect};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::signals::SignalHandler;

/// Environment variable naming a configuration file.
const CONFIG_ENV: &str = "OPTFUZZ_CONFIG";

/// Configuration file picked up from the working directory.
const LOCAL_CONFIG: &str = "optfuzz.toml";

/// optfuzz command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "optfuzz",
    about = "Optimizer fuzz campaigns and log triage",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a time-boxed fuzz campaign.
    Fuzz(FuzzArgs),
    /// Reduce a log file to a pass/warn/fail report.
    Triage(TriageArgs),
}

#[derive(Args, Debug)]
struct FuzzArgs {
    /// Time budget in seconds.
    #[arg(long, short = 't')]
    time: Option<u64>,

    /// Run only this optimization pass (after normalization).
    #[arg(long, short = 's', value_name = "PASS")]
    single: Option<String>,

    /// Optimization level for pipeline mode.
    #[arg(long, short = 'o')]
    optlevel: Option<u8>,

    /// What to do when the program generator fails.
    #[arg(long, value_enum)]
    on_generator_failure: Option<GeneratorFailureArg>,

    /// Extra generator attempts with `--on-generator-failure retry`.
    #[arg(long, default_value = "1")]
    retries: u32,

    /// Directory for the transient source, IR, and binary files.
    #[arg(long, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Do not draw the progress bar.
    #[arg(long, short = 'q')]
    quiet: bool,
}

#[derive(Args, Debug)]
struct TriageArgs {
    /// Log file to reduce; a missing file produces an empty report.
    log: PathBuf,

    /// Log dialect.
    #[arg(long, value_enum, default_value = "tagged")]
    dialect: DialectArg,

    /// Print without ANSI colors.
    #[arg(long)]
    no_color: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum GeneratorFailureArg {
    Abort,
    Skip,
    Retry,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DialectArg {
    Tagged,
    Checker,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Tagged => Dialect::Tagged,
            DialectArg::Checker => Dialect::Checker,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    match &cli.command {
        Command::Fuzz(args) => run_fuzz(&cli, args),
        Command::Triage(args) => run_triage(args),
    }
}

/// Initialize logging with the specified log level.
///
/// Logs go to stderr so reports on stdout stay clean.
fn init_logging(level: &str) {
    let filter = format!(
        "optfuzz={level},optfuzz_campaign={level},optfuzz_triage={level},optfuzz_common={level}"
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `OPTFUZZ_CONFIG` environment variable
/// 3. `optfuzz.toml` in the working directory
/// 4. Built-in defaults
fn load_config(cli: &Cli) -> Result<FuzzConfig> {
    if let Some(config_path) = &cli.config {
        info!(?config_path, "Loading config from command-line argument");
        return FuzzConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from {CONFIG_ENV}");
            return FuzzConfig::from_file(&config_path)
                .with_context(|| format!("Failed to load config from {CONFIG_ENV}={env_path}"));
        }
        warn!(
            path = %env_path,
            "{CONFIG_ENV} set but file does not exist, checking other locations"
        );
    }

    let local_path = PathBuf::from(LOCAL_CONFIG);
    if local_path.exists() {
        info!(?local_path, "Loading config from working directory");
        return FuzzConfig::from_file(&local_path)
            .with_context(|| format!("Failed to load config from {}", local_path.display()));
    }

    info!("No config file found, using built-in defaults");
    Ok(FuzzConfig::default())
}

/// Apply command-line overrides on top of file configuration.
fn apply_overrides(config: &mut FuzzConfig, args: &FuzzArgs) {
    if let Some(secs) = args.time {
        config.campaign.time_budget = Duration::from_secs(secs);
    }
    if let Some(pass) = &args.single {
        config.campaign.single_pass = Some(pass.clone());
    }
    if let Some(level) = args.optlevel {
        config.campaign.opt_level = level;
    }
    if let Some(policy) = args.on_generator_failure {
        config.campaign.on_generator_failure = match policy {
            GeneratorFailureArg::Abort => GeneratorFailurePolicy::Abort,
            GeneratorFailureArg::Skip => GeneratorFailurePolicy::Skip,
            GeneratorFailureArg::Retry => GeneratorFailurePolicy::Retry {
                attempts: args.retries,
            },
        };
    }
    if let Some(dir) = &args.workdir {
        config.workspace.dir = dir.clone();
    }
}

fn run_fuzz(cli: &Cli, args: &FuzzArgs) -> Result<()> {
    let mut config = load_config(cli)?;
    apply_overrides(&mut config, args);

    let campaign = config
        .campaign
        .to_campaign_config()
        .context("Invalid campaign configuration")?;

    let signal_handler = SignalHandler::new();
    let progress: Box<dyn ProgressSink> = if args.quiet {
        Box::new(NoProgress)
    } else {
        Box::new(TerminalProgress::new())
    };

    let mut driver = CampaignDriver::new(
        config.toolchain.clone(),
        config.workspace.artifacts(),
        campaign,
    )
    .with_progress(progress)
    .with_stop_flag(signal_handler.stop_flag());

    let summary = driver
        .run_campaign()
        .context("Fuzz campaign aborted by toolchain failure")?;

    println!(
        "Executed {} programs in {:.1}s ({} generator failures){}",
        summary.executed,
        summary.elapsed.as_secs_f64(),
        summary.generator_failures,
        if summary.interrupted {
            ", interrupted"
        } else {
            ""
        }
    );
    info!(
        signals = signal_handler.signals_received(),
        stop_requested = signal_handler.stop_requested(),
        final_state = %summary.state,
        "Campaign finished"
    );

    Ok(())
}

fn run_triage(args: &TriageArgs) -> Result<()> {
    let report = optfuzz_triage::reduce(&args.log, args.dialect.into())
        .with_context(|| format!("Failed to triage {}", args.log.display()))?;

    let mode = if args.no_color {
        ColorMode::Plain
    } else {
        ColorMode::Ansi
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    optfuzz_triage::render(&report, &mut out, mode).context("Failed to write report")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzz_defaults() {
        let cli = Cli::parse_from(["optfuzz", "fuzz"]);
        let Command::Fuzz(args) = &cli.command else {
            panic!("expected fuzz subcommand");
        };
        assert!(args.time.is_none());
        assert!(args.single.is_none());

        let mut config = FuzzConfig::default();
        apply_overrides(&mut config, args);
        let campaign = config.campaign.to_campaign_config().unwrap();
        assert_eq!(campaign.time_budget, Duration::from_secs(60));
        assert_eq!(
            campaign.mode,
            optfuzz_common::config::CampaignMode::Pipeline { opt_level: 3 }
        );
    }

    #[test]
    fn test_fuzz_single_pass_args() {
        let cli = Cli::parse_from([
            "optfuzz",
            "fuzz",
            "-t",
            "5",
            "-s",
            "gvn",
            "--on-generator-failure",
            "retry",
            "--retries",
            "3",
        ]);
        let Command::Fuzz(args) = &cli.command else {
            panic!("expected fuzz subcommand");
        };

        let mut config = FuzzConfig::default();
        apply_overrides(&mut config, args);
        let campaign = config.campaign.to_campaign_config().unwrap();
        assert_eq!(campaign.time_budget, Duration::from_secs(5));
        assert_eq!(
            campaign.mode,
            optfuzz_common::config::CampaignMode::SinglePass {
                pass_name: "gvn".to_string()
            }
        );
        assert_eq!(
            campaign.on_generator_failure,
            GeneratorFailurePolicy::Retry { attempts: 3 }
        );
    }

    #[test]
    fn test_optlevel_override() {
        let cli = Cli::parse_from(["optfuzz", "fuzz", "-o", "1", "--workdir", "/tmp/run"]);
        let Command::Fuzz(args) = &cli.command else {
            panic!("expected fuzz subcommand");
        };
        let mut config = FuzzConfig::default();
        apply_overrides(&mut config, args);
        assert_eq!(config.campaign.opt_level, 1);
        assert_eq!(config.workspace.dir, PathBuf::from("/tmp/run"));
    }

    #[test]
    fn test_triage_args() {
        let cli = Cli::parse_from(["optfuzz", "triage", "run.log", "--dialect", "checker", "--no-color"]);
        let Command::Triage(args) = &cli.command else {
            panic!("expected triage subcommand");
        };
        assert_eq!(args.log, PathBuf::from("run.log"));
        assert_eq!(Dialect::from(args.dialect), Dialect::Checker);
        assert!(args.no_color);
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["optfuzz", "fuzz", "-c", "campaign.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("campaign.toml")));
    }

    #[test]
    fn test_load_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("optfuzz.toml");
        std::fs::write(&path, "[campaign]\ntime_budget = \"2m\"\nopt_level = 2\n").unwrap();

        let cli = Cli::parse_from(["optfuzz", "-c", path.to_str().unwrap(), "fuzz"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.campaign.time_budget, Duration::from_secs(120));
        assert_eq!(config.campaign.opt_level, 2);
    }
}
