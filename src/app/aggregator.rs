//! Tumbling-window aggregator: buckets updates by (exchange, pair),
//! flushes batch statistics on a period tick, and periodically asks the
//! cache to garbage-collect stale latest-price keys.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::models::{PriceStats, PriceUpdate};
use crate::domain::ports::{Cache, PriceRepository};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);
const CLEANUP_PATTERN: &str = "latest:*";

/// Runs until `input` closes or `cancel` fires, performing one final
/// flush before returning in either case.
pub async fn run_aggregator(
    mut input: mpsc::Receiver<PriceUpdate>,
    window: Duration,
    repository: Arc<dyn PriceRepository>,
    cache: Arc<dyn Cache>,
    cancel: CancellationToken,
) {
    let mut buffer: HashMap<(String, String), Vec<f64>> = HashMap::new();
    let mut window_tick = time::interval(window);
    let mut clean_tick = time::interval(CLEANUP_INTERVAL);
    // The first tick of an interval fires immediately; consume it so the
    // window actually spans `window` before the first flush.
    window_tick.tick().await;
    clean_tick.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("aggregator cancelled, performing final flush");
                flush(&mut buffer, Utc::now(), repository.as_ref()).await;
                return;
            }
            update = input.recv() => {
                match update {
                    Some(update) => {
                        buffer.entry((update.exchange, update.pair)).or_default().push(update.price);
                    }
                    None => {
                        info!("aggregator input closed, performing final flush");
                        flush(&mut buffer, Utc::now(), repository.as_ref()).await;
                        return;
                    }
                }
            }
            _ = window_tick.tick() => {
                flush(&mut buffer, Utc::now(), repository.as_ref()).await;
            }
            _ = clean_tick.tick() => {
                if let Err(e) = cache.clean_old(CLEANUP_PATTERN).await {
                    warn!(error = %e, "clean_old failed, continuing");
                }
            }
        }
    }
}

async fn flush(
    buffer: &mut HashMap<(String, String), Vec<f64>>,
    tick_instant: chrono::DateTime<Utc>,
    repository: &dyn PriceRepository,
) {
    if buffer.is_empty() {
        return;
    }

    let batch: Vec<PriceStats> = buffer
        .drain()
        .filter(|(_, prices)| !prices.is_empty())
        .map(|((exchange, pair), prices)| PriceStats::from_prices(exchange, pair, tick_instant, &prices))
        .collect();

    if batch.is_empty() {
        return;
    }

    let n = batch.len();
    if let Err(e) = repository.store_stats_batch(&batch).await {
        error!(error = %e, windows = n, "batch persist failed, window data lost");
    } else {
        info!(windows = n, "flushed window batch");
    }
}
