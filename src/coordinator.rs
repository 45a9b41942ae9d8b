//! Fan-out of probe instances: spawn, classify, report, join

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::probe;
use crate::report::Console;
use crate::target::{ProbeInstance, Target};
use crate::verdict;

/// Expand every target into one instance per repetition.
fn expand(targets: &[Target]) -> Vec<ProbeInstance> {
    targets
        .iter()
        .flat_map(|t| (0..t.repetitions).map(move |i| ProbeInstance::new(t, i)))
        .collect()
}

/// Run all probes concurrently, one task per instance, with no cap on
/// fan-out. Returns only after every instance has reported, and no
/// instance failure ever affects another.
pub async fn run_all(targets: &[Target], timeout_ms: u64, console: Arc<Console>) {
    let mut tasks = JoinSet::new();
    for instance in expand(targets) {
        let console = Arc::clone(&console);
        tasks.spawn(async move {
            run_one(instance, timeout_ms, &console).await;
        });
    }

    // join barrier: overall completion only after the last verdict
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::warn!("Probe task failed to join: {}", e);
        }
    }
}

async fn run_one(instance: ProbeInstance, timeout_ms: u64, console: &Console) {
    tracing::debug!(
        "Dispatching {} -> {} (provider {})",
        instance.display_id,
        instance.target.url,
        instance.target.provider
    );
    match probe::execute(&instance, timeout_ms, console).await {
        Ok(outcome) => {
            let verdict = verdict::classify(&outcome);
            console.result_line(&instance.display_id, &outcome, &verdict);
        }
        Err(e) => {
            console.message(
                &instance.display_id,
                &format!("probe setup failed: {:#}", e),
            );
        }
    }
}
