//! Sequential driver for one probing run.

use crate::metrics::Accumulator;
use crate::probe::{gather, Target};

/// Probe every target once, in order.
///
/// A failing target is logged and contributes no metric; the remaining
/// targets are still probed.
pub async fn run(targets: &mut [Target]) -> Accumulator {
    let mut acc = Accumulator::new();
    let mut failed = 0;

    tracing::info!("Probing {} targets", targets.len());

    for target in targets.iter_mut() {
        match gather(target, &mut acc).await {
            Ok(()) => tracing::debug!("Probed {} {}", target.method, target.address),
            Err(e) if e.is_network() => {
                failed += 1;
                tracing::warn!("Probe failed for {}: {}", target.address, e);
            }
            Err(e) => {
                failed += 1;
                tracing::error!("Skipping target {}: {}", target.address, e);
            }
        }
    }

    tracing::info!(
        "Run complete: {} metrics, {} failed targets",
        acc.len(),
        failed
    );
    acc
}
