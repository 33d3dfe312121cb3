// sitesnap: capture screenshots, visible text and rendered HTML for a
// catalog of pages through one headless browser session.

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use sitesnap::{CancelSignal, CaptureConfig, SettleStrategy, Target, TargetCatalog, capture_site};

/// Capture a fixed list of pages with a headless browser
#[derive(Parser, Debug)]
#[command(
    name = "sitesnap",
    version,
    about = "Capture full-page screenshots, visible text and rendered HTML for a list of pages",
    after_help = "ENVIRONMENT VARIABLES:\n\
        SITESNAP_CATALOG             JSON catalog file\n\
        SITESNAP_OUTPUT              Output root directory\n\
        SITESNAP_TIMEOUT_SECS        Navigation timeout per target\n\
        SITESNAP_SETTLE_MS           Fixed settle delay after navigation\n\
        SITESNAP_CHROME              Chrome/Chromium executable\n\
        SITESNAP_RUN_DEADLINE_SECS   Cancel the run after this many seconds\n\
        RUST_LOG                     Log filter (default: info)\n\n\
        EXIT CODES:\n\
        0  run completed (individual targets may have failed)\n\
        1  browser failed to launch, or the run aborted\n\
        2  invalid catalog or configuration"
)]
struct Args {
    /// JSON file with an array of {\"id\", \"url\"} objects
    #[arg(short, long, env = "SITESNAP_CATALOG")]
    catalog: Option<PathBuf>,

    /// Extra target as ID=URL, appended after the catalog file (repeatable)
    #[arg(short, long = "target", value_name = "ID=URL")]
    targets: Vec<String>,

    /// Root directory for screenshots/, scraped-content/ and the manifest
    #[arg(short, long, env = "SITESNAP_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// Navigation upper bound per target, including the network idle wait
    #[arg(long, env = "SITESNAP_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,

    /// Fixed settle delay in milliseconds (ignored with --settle dom-stable)
    #[arg(long, env = "SITESNAP_SETTLE_MS", default_value_t = 3000)]
    settle_ms: u64,

    /// How to wait for client-side rendering after network idle
    #[arg(long, value_enum, default_value_t = SettleMode::Fixed)]
    settle: SettleMode,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Chrome/Chromium executable (auto-detected when omitted)
    #[arg(long, env = "SITESNAP_CHROME")]
    chrome: Option<PathBuf>,

    /// Keep artifacts of ids no longer in the catalog
    #[arg(long)]
    no_prune: bool,

    /// Do not write capture-manifest.json
    #[arg(long)]
    no_manifest: bool,

    /// Cancel the whole run after this many seconds
    #[arg(long, env = "SITESNAP_RUN_DEADLINE_SECS")]
    run_deadline_secs: Option<u64>,
}

/// Exit status for an unusable catalog or configuration
const EXIT_CONFIG_ERROR: u8 = 2;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SettleMode {
    Fixed,
    DomStable,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("chromiumoxide::handler", log::LevelFilter::Off)
        .filter_module("chromiumoxide::conn", log::LevelFilter::Off)
        .init();

    let args = Args::parse();

    let config = match build_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let cancel = CancelSignal::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling run");
                cancel.cancel();
            }
        }
    });
    if let Some(secs) = args.run_deadline_secs {
        cancel.cancel_after(Duration::from_secs(secs));
    }

    match capture_site(config, &cancel).await {
        Ok(report) => {
            for failure in report.failures() {
                warn!(
                    "{}: {}",
                    failure.target_id,
                    failure.reason().unwrap_or("unknown failure")
                );
            }
            info!(
                "{} captured, {} failed{}",
                report.succeeded(),
                report.failed(),
                if report.cancelled { " (cancelled)" } else { "" }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn build_config(args: &Args) -> Result<CaptureConfig> {
    let mut targets = match &args.catalog {
        Some(path) => TargetCatalog::from_json_file(path).await?.into_targets(),
        None => Vec::new(),
    };
    for pair in &args.targets {
        targets.push(Target::parse_pair(pair)?);
    }
    if targets.is_empty() {
        bail!("no targets given; use --catalog <file> or --target ID=URL");
    }

    let catalog = TargetCatalog::new(targets).context("Invalid target catalog")?;

    let settle = match args.settle {
        SettleMode::Fixed => SettleStrategy::fixed(Duration::from_millis(args.settle_ms)),
        SettleMode::DomStable => SettleStrategy::dom_stable(),
    };

    CaptureConfig::builder()
        .output_root(&args.output)
        .catalog(catalog)
        .navigation_timeout(Duration::from_secs(args.timeout_secs))
        .settle(settle)
        .headless(!args.headed)
        .chrome_executable(args.chrome.clone())
        .prune_stale(!args.no_prune)
        .write_manifest(!args.no_manifest)
        .build()
}
