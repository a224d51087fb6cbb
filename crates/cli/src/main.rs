//! `diagctl` – run device health diagnostics from the command line.
//!
//! Probes the host (or an attached Android device over adb), prints each
//! test outcome and a device-level summary. Exit code 0 means healthy,
//! 1 means issues were detected, 2 means the invocation itself failed.

mod config;
mod logging;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use engine::catalog::{self, Platform};
use engine::device::{self, DeviceInfo};
use engine::replay;
use engine::types::*;
use engine::{DiagContext, Runner};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const EXIT_HEALTHY: u8 = 0;
const EXIT_ISSUES: u8 = 1;
const EXIT_USAGE: u8 = 2;

// ===========================================================================
// CLI definition
// ===========================================================================

#[derive(Parser)]
#[command(name = "diagctl", version, about = "Device health diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe the device a run would diagnose.
    Detect {
        /// Target platform: windows | macos | android (default: from host).
        #[arg(long)]
        platform: Option<Platform>,
        /// Output as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// List the tests available for a platform.
    List {
        /// Target platform: windows | macos | android (default: from host).
        #[arg(long)]
        platform: Option<Platform>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run diagnostic tests and print their outcomes.
    Run {
        /// Target platform: windows | macos | android (default: from host,
        /// or the fixture's platform when replaying).
        #[arg(long)]
        platform: Option<Platform>,
        /// Comma-separated test ids (default: the whole catalog).
        #[arg(long, value_delimiter = ',')]
        tests: Vec<String>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Number of tests run concurrently.
        #[arg(long)]
        workers: Option<usize>,
        /// Per-probe timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
        /// Answer probes from a recorded YAML fixture instead of real tools.
        #[arg(long)]
        replay: Option<PathBuf>,
    },
}

// ===========================================================================
// Main
// ===========================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: failed to load configuration: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };
    logging::init_logging(&cfg.logging);

    let result = match cli.command {
        Commands::Detect { platform, json } => cmd_detect(platform, json).await,
        Commands::List { platform, json } => cmd_list(platform, json),
        Commands::Run {
            platform,
            tests,
            json,
            workers,
            timeout,
            replay,
        } => {
            let opts = RunOptions {
                platform,
                tests,
                json,
                workers: workers.unwrap_or(cfg.max_workers),
                timeout: timeout
                    .map(|s| Duration::from_secs(s.max(1)))
                    .unwrap_or_else(|| cfg.probe_timeout()),
                replay,
            };
            cmd_run(opts).await
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_USAGE)
        }
    }
}

// ===========================================================================
// Subcommand implementations
// ===========================================================================

async fn cmd_detect(platform: Option<Platform>, json: bool) -> anyhow::Result<u8> {
    let ctx = DiagContext::default_platform();
    let info = device::detect(&ctx, platform).await;
    if json {
        print_json(&info)?;
    } else {
        print_device(&info);
    }
    Ok(EXIT_HEALTHY)
}

fn cmd_list(platform: Option<Platform>, json: bool) -> anyhow::Result<u8> {
    let platform = resolve_platform(platform)?;
    let tests = catalog::describe(platform);
    if json {
        print_json(&tests)?;
    } else {
        println!("Tests for {}:", platform);
        for t in &tests {
            println!("  {:<22} {:<12} {}", t.id, t.category, t.name);
        }
    }
    Ok(EXIT_HEALTHY)
}

struct RunOptions {
    platform: Option<Platform>,
    tests: Vec<String>,
    json: bool,
    workers: usize,
    timeout: Duration,
    replay: Option<PathBuf>,
}

async fn cmd_run(opts: RunOptions) -> anyhow::Result<u8> {
    let (ctx, platform) = match &opts.replay {
        Some(path) => {
            let fixture = load_fixture_file(path)?;
            let platform = match opts.platform.or(fixture.platform) {
                Some(p) => p,
                None => resolve_platform(None)?,
            };
            (fixture.into_context(), platform)
        }
        None => (
            DiagContext::default_platform(),
            resolve_platform(opts.platform)?,
        ),
    };
    let ctx = ctx
        .with_max_workers(opts.workers)
        .with_probe_timeout(opts.timeout);

    let test_ids: Vec<String> = opts
        .tests
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let test_ids = if test_ids.is_empty() {
        catalog::all_ids(platform)
    } else {
        test_ids
    };

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let request = RunRequest { platform, test_ids };
    let response = Runner::new(Arc::new(ctx)).run(&request, cancel).await;

    if opts.json {
        print_json(&response)?;
    } else {
        print_run(&response);
    }

    Ok(if response.summary.is_healthy() {
        EXIT_HEALTHY
    } else {
        EXIT_ISSUES
    })
}

fn resolve_platform(platform: Option<Platform>) -> anyhow::Result<Platform> {
    match platform.or_else(Platform::detect) {
        Some(p) => Ok(p),
        None => bail!(
            "cannot infer a platform for host OS '{}'; pass --platform",
            std::env::consts::OS
        ),
    }
}

fn load_fixture_file(path: &Path) -> anyhow::Result<replay::Fixture> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read fixture file {}", path.display()))?;
    replay::load_fixture(&yaml).with_context(|| format!("invalid fixture {}", path.display()))
}

fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling remaining tests");
            cancel.cancel();
        }
    });
}

// ===========================================================================
// Output helpers
// ===========================================================================

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let j = serde_json::to_string_pretty(value).context("failed to serialise output")?;
    println!("{}", j);
    Ok(())
}

fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Pass => "PASS",
        Status::Warn => "WARN",
        Status::Fail => "FAIL",
        Status::Error => "ERROR",
    }
}

fn print_device(info: &DeviceInfo) {
    println!("Device {}", info.id);
    println!("  class:    {:?}", info.device_class);
    println!("  os:       {} {}", info.os, info.os_version);
    if let Some(ref make) = info.make {
        println!("  make:     {}", make);
    }
    if let Some(ref model) = info.model {
        println!("  model:    {}", model);
    }
    match info.platform {
        Some(p) => println!("  platform: {}", p),
        None => println!("  platform: unsupported"),
    }
    println!("  capabilities: {}", info.capabilities.join(", "));
}

fn print_run(r: &RunResponse) {
    println!("Run {} on {}", r.run_id, r.platform);
    for o in &r.outcomes {
        print_outcome(o);
    }

    let s = &r.summary;
    println!();
    println!(
        "Summary: {}/{} passed, {} warnings, {} failed, {} errors",
        s.passed, s.total_tests, s.warnings, s.failed, s.errors
    );
    println!(
        "  health score: {:.1}% ({})",
        s.health_score,
        s.overall_status.as_str()
    );
}

fn print_outcome(o: &TestOutcome) {
    println!(
        "[{}] {} ({}) – {}",
        status_icon(o.status),
        o.test_id,
        o.category,
        o.explanation
    );
    if o.status != Status::Error {
        println!("  confidence: {:.2}", o.confidence);
    }
    for (name, value) in &o.metrics {
        println!("    {}: {}", name, value);
    }
    for advice in &o.advisories {
        println!("  -> {}", advice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "diagctl",
            "run",
            "--platform",
            "android",
            "--tests",
            "battery.health,storage.health",
            "--workers",
            "2",
            "--json",
        ])
        .expect("should parse");
        match cli.command {
            Commands::Run {
                platform,
                tests,
                workers,
                json,
                ..
            } => {
                assert_eq!(platform, Some(Platform::Android));
                assert_eq!(tests, vec!["battery.health", "storage.health"]);
                assert_eq!(workers, Some(2));
                assert!(json);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_platform() {
        assert!(Cli::try_parse_from(["diagctl", "list", "--platform", "beos"]).is_err());
    }

    #[tokio::test]
    async fn test_replayed_run_exit_codes() {
        let dir = std::env::temp_dir().join(format!("diagctl-{}", new_run_id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fixture.yaml");
        std::fs::write(
            &path,
            "platform: macos\nprobes:\n  - command: \"df -k /\"\n    stdout: |\n      Filesystem 1024-blocks Used Available Capacity Mounted on\n      /dev/disk1 1000 100 900 10% /\n",
        )
        .unwrap();

        let opts = |tests: &[&str]| RunOptions {
            platform: None,
            tests: tests.iter().map(|s| s.to_string()).collect(),
            json: true,
            workers: 2,
            timeout: Duration::from_secs(1),
            replay: Some(path.clone()),
        };
        assert_eq!(cmd_run(opts(&["storage.health"])).await.unwrap(), EXIT_HEALTHY);
        // No recorded output for vm_stat / sysctl.
        assert_eq!(cmd_run(opts(&["memory.test"])).await.unwrap(), EXIT_ISSUES);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_missing_fixture_is_error() {
        let opts = RunOptions {
            platform: Some(Platform::MacOs),
            tests: vec![],
            json: true,
            workers: 1,
            timeout: Duration::from_secs(1),
            replay: Some(PathBuf::from("/nonexistent/fixture.yaml")),
        };
        assert!(cmd_run(opts).await.is_err());
    }
}
