//! agriprobe CLI - conformance checks and live monitoring for AgriShield devices
//!
//! Run the check suite against a device, then optionally watch its telemetry.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{IsTerminal, Write};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use agriprobe::checks::registry::{CHECKS, list_checks, select_checks};
use agriprobe::client::DeviceClient;
use agriprobe::config::Config;
use agriprobe::monitor::{Monitor, MonitorOptions, MonitorSummary, Termination};
use agriprobe::runner::Runner;

/// Exit code for a second Ctrl+C, which abandons any in-flight restore
const EXIT_INTERRUPTED: i32 = 130;

/// agriprobe - conformance harness for AgriShield field devices
#[derive(Debug, Parser)]
#[command(name = "agriprobe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Defaults to `check` when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where to find the device
#[derive(Debug, Default, Args)]
struct TargetArgs {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Device base URL, overrides the configuration file
    #[arg(short, long)]
    target: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the check suite against a device
    Check {
        #[command(flatten)]
        target: TargetArgs,

        /// Specific checks to run (comma-separated)
        #[arg(short = 'C', long)]
        checks: Option<String>,

        /// Start monitoring after a fully passing run without asking
        #[arg(long, conflicts_with = "no_prompt")]
        monitor: bool,

        /// Never offer monitoring after the run
        #[arg(long)]
        no_prompt: bool,

        /// Write the report as JSON to this file
        #[arg(long)]
        report: Option<String>,
    },

    /// Watch live telemetry from a device
    Monitor {
        #[command(flatten)]
        target: TargetArgs,

        /// How long to monitor (e.g. 30s, 5m)
        #[arg(short, long, value_parser = humantime::parse_duration)]
        duration: Option<Duration>,

        /// Wait between samples (e.g. 2s)
        #[arg(short, long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
    },

    /// Generate a default configuration file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "agriprobe.yaml")]
        output: String,
    },

    /// List available checks
    List,

    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "agriprobe.yaml")]
        config: String,
    },
}

fn setup_logging(verbose: bool, json: bool) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.json);

    match run(cli.command).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "Fatal error");
            eprintln!("\nFatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Option<Commands>) -> Result<u8> {
    match command {
        None => run_checks(&TargetArgs::default(), None, false, false, None).await,

        Some(Commands::Check {
            target,
            checks,
            monitor,
            no_prompt,
            report,
        }) => {
            run_checks(
                &target,
                checks.as_deref(),
                monitor,
                no_prompt,
                report.as_deref(),
            )
            .await
        }

        Some(Commands::Monitor {
            target,
            duration,
            interval,
        }) => {
            let config = load_config(&target)?;
            let device = config.target.to_client().context("Failed to create device client")?;
            let mut options = config.monitor.to_options()?;
            options.duration = duration.unwrap_or(options.duration);
            options.interval = interval.unwrap_or(options.interval);
            anyhow::ensure!(!options.interval.is_zero(), "--interval must be greater than zero");

            let summary = run_monitor(&device, options).await;
            Ok(if summary.samples == 0 && summary.errors > 0 {
                1
            } else {
                0
            })
        }

        Some(Commands::Init { output }) => init_config(&output).map(|()| 0),

        Some(Commands::List) => {
            print_checks();
            Ok(0)
        }

        Some(Commands::Validate { config }) => validate_config(&config).map(|()| 0),
    }
}

/// Load the configuration file (or defaults) and apply the target override
fn load_config(args: &TargetArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!(config = %path, "Loading configuration");
            Config::from_file(path).with_context(|| format!("Failed to load config from {path}"))?
        }
        None => Config::default(),
    };

    if let Some(url) = &args.target {
        config.target.base_url = url.clone();
    }

    for name in config.unknown_checks() {
        tracing::warn!(check = name, "Unknown check in configuration, ignoring");
    }

    Ok(config)
}

/// Run the check suite, print the report and optionally hand off to the monitor
async fn run_checks(
    args: &TargetArgs,
    check_filter: Option<&str>,
    monitor: bool,
    no_prompt: bool,
    report_path: Option<&str>,
) -> Result<u8> {
    let config = load_config(args)?;

    tracing::info!(
        device = %config.target.name,
        url = %config.target.base_url,
        timeout = ?config.target.request_timeout,
        "Target configured"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ctx = config
        .target
        .to_check_context()
        .context("Failed to create check context")?
        .with_shutdown(shutdown_rx);
    let monitor_options = config.monitor.to_options()?;
    let runner = Runner::new(ctx.clone(), config);

    let checks = match check_filter {
        Some(filter) => {
            let (selected, unknown) = select_checks(filter);
            for name in unknown {
                tracing::warn!(check = %name, "Unknown check, skipping");
            }
            selected
        }
        None => runner.enabled_checks(),
    };

    if checks.is_empty() {
        tracing::warn!("No checks to run");
        return Ok(0);
    }

    let rule = "=".repeat(60);
    println!("\n{rule}");
    println!("  AgriShield Device API Test Suite");
    println!("{rule}");
    println!("Target: {}", ctx.device.base_url());
    println!("Time: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!();

    let signal_task = tokio::spawn(forward_ctrl_c(
        shutdown_tx,
        "\n\nTests interrupted by user, finishing the current step (Ctrl+C again to force)",
    ));
    let report = runner.run(&checks).await;
    signal_task.abort();

    println!("{}", report.render_text());

    if let Some(path) = report_path {
        let json = report.to_json().context("Failed to serialize report")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report to {path}"))?;
        tracing::info!(path = %path, "Report written");
    }

    if report.is_clean() && (monitor || (!no_prompt && prompt_for_monitor().await?)) {
        run_monitor(&ctx.device, monitor_options).await;
    }

    Ok(report.exit_code())
}

/// Ask on the terminal whether to start monitoring; `false` when not interactive
async fn prompt_for_monitor() -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        return Ok(false);
    }

    print!("All tests passed! Run continuous monitoring? (y/n): ");
    std::io::stdout().flush()?;

    let answer = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await
    .context("Prompt task failed")??;

    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Run the monitor until its duration elapses or Ctrl+C is pressed
async fn run_monitor(device: &DeviceClient, options: MonitorOptions) -> MonitorSummary {
    let rule = "=".repeat(60);
    println!("\n{rule}");
    println!(
        "  Continuous Monitoring ({}s)",
        options.duration.as_secs_f64().round()
    );
    println!("{rule}");
    println!("Monitoring sensor values in real-time... (Ctrl+C to stop)\n");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_task = tokio::spawn(forward_ctrl_c(shutdown_tx, ""));

    let summary = Monitor::new(device, options)
        .run(shutdown_rx, |event| println!("{}", event.to_line()))
        .await;
    signal_task.abort();

    match summary.termination {
        Termination::Completed => println!("\nContinuous monitoring completed"),
        Termination::Interrupted => println!("\nMonitoring interrupted by user"),
    }
    println!(
        "{} samples, {} errors in {:.1}s",
        summary.samples,
        summary.errors,
        summary.elapsed.as_secs_f64()
    );

    summary
}

/// Turn the first Ctrl+C into a shutdown signal so running work can clean up.
/// A second Ctrl+C exits immediately.
async fn forward_ctrl_c(shutdown: watch::Sender<bool>, notice: &'static str) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    if !notice.is_empty() {
        println!("{notice}");
    }
    let _ = shutdown.send(true);

    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("Forced exit; if the config round-trip was running, the device may not have been restored");
        std::process::exit(EXIT_INTERRUPTED);
    }
}

/// Generate a default configuration file
fn init_config(output: &str) -> Result<()> {
    let config = Config::default_config();
    let yaml = config.to_yaml().context("Failed to serialize config")?;

    std::fs::write(output, &yaml).with_context(|| format!("Failed to write config to {output}"))?;

    tracing::info!(path = %output, "Configuration file created");
    println!("Created {output}");
    println!();
    println!("Edit the target address if your device is not on its own access point, then run:");
    println!("  agriprobe check --config {output}");

    Ok(())
}

/// List available checks
fn print_checks() {
    println!("Available checks (in execution order):");
    println!();

    for (name, check) in CHECKS.iter() {
        println!("  {name:20} - {}", check.description());
    }

    println!();
    println!("Run specific checks with:");
    println!("  agriprobe check --checks health,status");
}

/// Validate a configuration file
fn validate_config(config_path: &str) -> Result<()> {
    tracing::info!(config = %config_path, "Validating configuration");

    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    config
        .target
        .to_client()
        .context("Invalid target configuration")?;
    config
        .monitor
        .to_options()
        .context("Invalid monitor configuration")?;

    println!("Configuration is valid!");
    println!();
    println!(
        "Target: {} ({}, timeout {})",
        config.target.name,
        config.target.base_url,
        humantime::format_duration(config.target.request_timeout)
    );
    println!(
        "Monitor: {} every {}",
        humantime::format_duration(config.monitor.duration),
        humantime::format_duration(config.monitor.interval)
    );

    println!();
    println!("Checks:");
    for name in list_checks() {
        let status = if config.is_check_enabled(name) {
            "enabled"
        } else {
            "disabled"
        };
        println!("  - {name}: {status}");
    }

    let unknown = config.unknown_checks();
    if !unknown.is_empty() {
        println!();
        println!("Unknown checks (ignored): {}", unknown.join(", "));
    }

    Ok(())
}
