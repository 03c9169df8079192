//! Single dispatcher task: reads the shared fan-in channel and
//! round-robins each update into one of `W` per-worker queues.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::domain::models::PriceUpdate;

/// Spawns the dispatcher task and returns immediately; the task exits
/// when `input` closes or `cancel` fires, closing every worker queue by
/// dropping its sender half.
pub fn spawn_fanout(
    mut input: mpsc::Receiver<PriceUpdate>,
    worker_queues: Vec<mpsc::Sender<PriceUpdate>>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut next = 0usize;
        let w = worker_queues.len().max(1);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("fan-out dispatcher cancelled");
                    break;
                }
                update = input.recv() => {
                    let Some(update) = update else {
                        info!("fan-out input closed");
                        break;
                    };

                    let queue = &worker_queues[next % w];
                    next = next.wrapping_add(1);

                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        res = queue.send(update) => {
                            if res.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }
        // worker_queues drops here, closing every worker's receiver.
    });
}
