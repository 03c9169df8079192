//! `PriceService` wires the shared sink, fan-out dispatcher, worker pool
//! and aggregator into a single ingestion pipeline.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::mode::{ExchangeEndpoint, Mode, ModeManager};
use crate::app::pipeline::{spawn_fanout, spawn_worker};
use crate::domain::ports::{Cache, PriceRepository};

const SINK_CAPACITY: usize = 128;
const WORKER_QUEUE_CAPACITY: usize = 128;
const DEFAULT_WORKER_COUNT: usize = 5;

/// Owns the wiring of the ingestion pipeline: mode manager, fan-out
/// dispatcher, worker pool and aggregator. `sink` is exposed so the HTTP
/// mode-switch handlers can drive `ModeManager` with the same channel
/// the pipeline was built with.
pub struct PriceService {
    pub mode_manager: Arc<ModeManager>,
    pub sink: mpsc::Sender<crate::domain::models::PriceUpdate>,
    aggregator_handle: tokio::task::JoinHandle<()>,
}

impl PriceService {
    /// Builds and starts the full pipeline: fan-out, `worker_count`
    /// workers, and the aggregator, then starts the source layer in
    /// `initial_mode`.
    pub async fn start(
        live_endpoints: Vec<ExchangeEndpoint>,
        initial_mode: Mode,
        worker_count: usize,
        window: Duration,
        cache: Arc<dyn Cache>,
        repository: Arc<dyn PriceRepository>,
        cancel: CancellationToken,
    ) -> Self {
        let worker_count = if worker_count == 0 { DEFAULT_WORKER_COUNT } else { worker_count };

        let (sink_tx, sink_rx) = mpsc::channel(SINK_CAPACITY);
        let (agg_tx, agg_rx) = mpsc::channel(SINK_CAPACITY);

        let mut worker_queues = Vec::with_capacity(worker_count);
        let mut worker_senders = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let (tx, rx) = mpsc::channel(WORKER_QUEUE_CAPACITY);
            worker_senders.push(tx);
            worker_queues.push(rx);
        }

        spawn_fanout(sink_rx, worker_senders, cancel.clone());

        for (id, queue) in worker_queues.into_iter().enumerate() {
            spawn_worker(id, queue, agg_tx.clone(), cache.clone(), cancel.clone());
        }
        drop(agg_tx);

        let aggregator_handle = {
            let cache = cache.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                crate::app::aggregator::run_aggregator(agg_rx, window, repository, cache, cancel).await;
            })
        };

        let mode_manager = Arc::new(ModeManager::new(live_endpoints, cancel.clone()));
        mode_manager
            .start(sink_tx.clone(), initial_mode)
            .await
            .expect("initial_mode is always one of {test, live}");

        info!(worker_count, mode = initial_mode.as_str(), "price service started");

        Self {
            mode_manager,
            sink: sink_tx,
            aggregator_handle,
        }
    }

    /// Stops the active source set and waits (bounded by the caller's own
    /// timeout) for the aggregator's final flush to complete.
    pub async fn shutdown(self) {
        self.mode_manager.stop().await;
        let _ = self.aggregator_handle.await;
    }
}
