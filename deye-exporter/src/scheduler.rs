use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::catalog::RegisterCatalog;
use crate::collector::Collector;
use crate::transport::RegisterTransport;

/// Run `collect_once` every `period` until `shutdown` completes
///
/// The first cycle runs immediately. A cycle that takes longer than the period delays the next
/// tick instead of triggering a burst of catch-up cycles. Returns the number of completed cycles.
pub async fn run<T, C, F>(collector: &mut Collector<T, C>, period: Duration, shutdown: F) -> u64
where
    T: RegisterTransport,
    C: RegisterCatalog,
    F: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);
    let mut cycles: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("stopping collection after {} cycles", cycles);
                return cycles;
            }
            _ = interval.tick() => {
                let report = collector.collect_once().await;
                cycles += 1;
                if report.is_complete() {
                    tracing::info!(cycle = cycles, "collection complete - {}", report);
                } else {
                    tracing::warn!(cycle = cycles, "collection incomplete - {}", report);
                }
            }
        }
    }
}
