use std::path::PathBuf;
use std::process::ExitCode;

use host_scan_rs::config::{self, ScanConfig};
use host_scan_rs::types::{OpenPort, ScanTarget};
use host_scan_rs::{output, resolve, PortRange, Scanner};

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// host-scan-rs — Fast, bounded-concurrency TCP connect scanner for a single host.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "host-scan-rs",
    version,
    about = "Fast, bounded-concurrency TCP connect scanner for a single host.",
    long_about = None
)]
struct Cli {
    /// Hostname or IP address to scan.
    target: String,

    /// First port of the range (clamped into 1..=65535).
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    start: i64,

    /// Last port of the range, inclusive (clamped into 1..=65535).
    #[arg(long, default_value_t = 1024, allow_negative_numbers = true)]
    end: i64,

    /// Port range as START-END or a single PORT (clamped into 1..=65535).
    #[arg(long, conflicts_with_all = ["start", "end"])]
    ports: Option<PortRange>,

    /// Connect timeout per attempt, in seconds.
    #[arg(long, default_value_t = 0.8)]
    timeout: f64,

    /// Banner read timeout, in seconds.
    #[arg(long = "banner-timeout", default_value_t = 0.7)]
    banner_timeout: f64,

    /// Max concurrent TCP connect attempts.
    #[arg(long, default_value_t = config::DEFAULT_WORKERS)]
    workers: usize,

    /// Try to read a banner from open ports.
    #[arg(long, default_value_t = false)]
    banner: bool,

    /// Append open ports as `<address>:<port>[ - <banner>]` lines to this file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write the full report as pretty JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the scan was interrupted.
async fn run(cli: Cli) -> Result<bool> {
    let range = match cli.ports {
        Some(r) => r,
        None => PortRange::clamped(cli.start, cli.end)?,
    };
    let config = ScanConfig::default()
        .with_connect_timeout(config::duration_from_secs(cli.timeout).context("--timeout")?)
        .with_banner_timeout(
            config::duration_from_secs(cli.banner_timeout).context("--banner-timeout")?,
        )
        .with_workers(cli.workers)
        .with_banner(cli.banner);
    config.validate()?;

    let address = resolve::resolve_host(&cli.target).await?;
    let target = ScanTarget::new(address, range);
    let scanner = Scanner::new(config);
    output::print_header(&cli.target, &target, scanner.config());

    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_ctrlc.cancel();
        }
    });

    let mut sink = |found: &OpenPort| println!("{}", output::format_discovery(found));
    let report = scanner.run(&target, &mut sink, cancel).await?;

    if report.cancelled {
        println!("\nInterrupted by user");
    }
    println!();
    println!("{}", output::format_summary(&report));
    output::print_results_table(&report);

    if let Some(path) = cli.output.as_deref() {
        match output::append_open_ports(path, &report) {
            Ok(0) => {}
            Ok(n) => println!("Saved {} line(s) to {}", n, path.display()),
            Err(e) => eprintln!("Error writing output file: {e:#}"),
        }
    }
    if let Some(path) = cli.json.as_deref() {
        if let Err(e) = output::write_report_json(path, &report) {
            eprintln!("Failed to write JSON to {}: {e:#}", path.display());
        } else {
            println!("Wrote JSON report to {}", path.display());
        }
    }

    Ok(!report.cancelled)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
