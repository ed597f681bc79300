use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::engine::EngineState;

pub(super) fn start_reporting_thread(
    state: Arc<EngineState>,
    stop_tx: broadcast::Sender<()>,
) -> JoinHandle<()> {
    let mut stop_rx = stop_tx.subscribe();
    tokio::spawn(async move {
        'run: loop {
            let sleep = tokio::time::sleep(state.config.report_interval());
            tokio::pin!(sleep);

            tokio::select! {
                _ = stop_rx.recv() => {
                    break 'run;
                }
                _ = &mut sleep => {
                    let stats = &state.stats;
                    log::info!(
                        "{} crawled at {} pages/minute, {} items at {} items/minute, {} dropped, {} enqueued",
                        stats.total_crawled(),
                        stats.crawled_per_minute(),
                        stats.total_emitted(),
                        stats.emitted_per_minute(),
                        stats.total_dropped(),
                        stats.total_enqueued(),
                    );
                }
            }
        }
    })
}
