//! Worker: drains one fan-out queue, writes each update to the cache,
//! and forwards it to the aggregator's input channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::models::PriceUpdate;
use crate::domain::ports::Cache;

/// Spawns a worker task reading from `queue` until it closes or `cancel`
/// fires. Cache write failures are logged and swallowed per the
/// ingestion-liveness-over-completeness policy; they never drop the
/// update from reaching `downstream`.
pub fn spawn_worker(
    id: usize,
    mut queue: mpsc::Receiver<PriceUpdate>,
    downstream: mpsc::Sender<PriceUpdate>,
    cache: Arc<dyn Cache>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(worker = id, "worker cancelled");
                    break;
                }
                update = queue.recv() => {
                    let Some(update) = update else {
                        info!(worker = id, "worker queue closed");
                        break;
                    };

                    if let Err(e) = cache.set_latest(&update).await {
                        warn!(worker = id, exchange = %update.exchange, pair = %update.pair, error = %e, "cache write failed, continuing");
                    }

                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        res = downstream.send(update) => {
                            if res.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingCache;

    #[async_trait]
    impl Cache for FailingCache {
        async fn set_latest(&self, _update: &PriceUpdate) -> Result<(), CacheError> {
            Err(CacheError::Backend(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "unreachable",
            ))))
        }
        async fn get_latest(&self, _exchange: &str, _pair: &str) -> Result<Option<PriceUpdate>, CacheError> {
            Ok(None)
        }
        async fn clean_old(&self, _pattern: &str) -> Result<(), CacheError> {
            Ok(())
        }
    }

    struct CountingCache {
        count: AtomicUsize,
    }

    #[async_trait]
    impl Cache for CountingCache {
        async fn set_latest(&self, _update: &PriceUpdate) -> Result<(), CacheError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn get_latest(&self, _exchange: &str, _pair: &str) -> Result<Option<PriceUpdate>, CacheError> {
            Ok(None)
        }
        async fn clean_old(&self, _pattern: &str) -> Result<(), CacheError> {
            Ok(())
        }
    }

    fn sample_update() -> PriceUpdate {
        PriceUpdate {
            exchange: "ex1".into(),
            pair: "P1".into(),
            price: 100.0,
            time: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn cache_failure_still_forwards_update() {
        let (tx, rx) = mpsc::channel(4);
        let (down_tx, mut down_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        spawn_worker(0, rx, down_tx, Arc::new(FailingCache), cancel.clone());

        tx.send(sample_update()).await.unwrap();
        let forwarded = down_rx.recv().await.unwrap();
        assert_eq!(forwarded.pair, "P1");
    }

    #[tokio::test]
    async fn every_update_attempts_exactly_one_cache_write() {
        let (tx, rx) = mpsc::channel(4);
        let (down_tx, mut down_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let cache = Arc::new(CountingCache { count: AtomicUsize::new(0) });

        spawn_worker(0, rx, down_tx, cache.clone(), cancel.clone());

        for _ in 0..3 {
            tx.send(sample_update()).await.unwrap();
        }
        for _ in 0..3 {
            down_rx.recv().await.unwrap();
        }

        assert_eq!(cache.count.load(Ordering::SeqCst), 3);
    }
}
