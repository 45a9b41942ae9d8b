//! DPI probe: detect HTTP blocking or throttling by watching how transfers behave.

mod coordinator;
mod observer;
mod probe;
mod report;
mod target;
mod verdict;

use std::sync::Arc;

use clap::Parser;
use report::Console;
use target::{RemoteSuiteSource, TargetSource};

#[derive(Parser, Debug)]
#[command(
    name = "dpi-probe",
    about = "Probe URLs and classify transfers as blocked, throttled or clean",
    long_about = "Fetches a suite of probe targets, runs one concurrent HTTP GET per target repetition, and classifies each transfer (bytes received, timeouts, early aborts) into a DPI-interference verdict."
)]
struct Cli {
    /// Per-probe timeout in milliseconds (non-numeric values keep the default)
    timeout_ms: Option<String>,
}

impl Cli {
    fn timeout_ms(&self) -> u64 {
        self.timeout_ms
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(probe::DEFAULT_TIMEOUT_MS)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let timeout_ms = cli.timeout_ms();
    let console = Arc::new(Console::new());

    // a failed or empty fetch never replaces the list we already hold
    let mut targets = target::default_suite();
    let source = RemoteSuiteSource::new(target::DEFAULT_SUITE_URL);
    match source.fetch().await {
        Ok(list) => targets = list,
        Err(e) => {
            tracing::warn!(
                "Failed to load remote suite: {:#}, using built-in targets",
                e
            );
        }
    }

    if targets.is_empty() {
        tracing::warn!("No probe targets available, nothing to do");
    } else {
        tracing::info!(
            "Probing {} target(s), timeout {} ms",
            targets.len(),
            timeout_ms
        );
    }

    coordinator::run_all(&targets, timeout_ms, Arc::clone(&console)).await;

    console.message("MAIN", "All probes finished.");
    Ok(())
}
