//! Synthetic price generator used in `test` mode.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::domain::models::PriceUpdate;
use crate::domain::ports::{ExchangeSource, SourceOutcome};

const PAIRS: &[&str] = &["BTCUSDT", "ETHUSDT", "DOGEUSDT", "TONUSDT", "SOLUSDT"];

fn base_price(pair: &str) -> f64 {
    match pair {
        "BTCUSDT" => 60_000.0,
        "ETHUSDT" => 3_000.0,
        "DOGEUSDT" => 0.12,
        "TONUSDT" => 5.5,
        "SOLUSDT" => 160.0,
        _ => 1.0,
    }
}

/// Emits one `PriceUpdate` per configured pair every second. Prices are
/// drawn uniformly within +/-2% of a fixed per-pair base.
pub struct TestSource {
    exchange: String,
    stop: CancellationToken,
}

impl TestSource {
    pub fn new(exchange: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            stop: CancellationToken::new(),
        }
    }

    fn random_price(pair: &str) -> f64 {
        let base = base_price(pair);
        let jitter = rand::thread_rng().gen_range(-0.02..=0.02);
        base + base * jitter
    }
}

#[async_trait]
impl ExchangeSource for TestSource {
    fn label(&self) -> &str {
        &self.exchange
    }

    async fn run(&self, cancel: CancellationToken, sink: mpsc::Sender<PriceUpdate>) -> SourceOutcome {
        info!(exchange = %self.exchange, "test source starting");
        let mut tick = interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(exchange = %self.exchange, "test source cancelled");
                    return SourceOutcome::Cancelled;
                }
                _ = self.stop.cancelled() => {
                    info!(exchange = %self.exchange, "test source stopped");
                    return SourceOutcome::Cancelled;
                }
                _ = tick.tick() => {
                    for &pair in PAIRS {
                        let update = PriceUpdate {
                            exchange: self.exchange.clone(),
                            pair: pair.to_string(),
                            price: Self::random_price(pair),
                            time: Utc::now(),
                        };
                        tokio::select! {
                            _ = cancel.cancelled() => return SourceOutcome::Cancelled,
                            _ = self.stop.cancelled() => return SourceOutcome::Cancelled,
                            res = sink.send(update) => {
                                if res.is_err() {
                                    return SourceOutcome::Cancelled;
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    fn stop(&self) {
        self.stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn produces_one_update_per_pair_per_tick() {
        let source = TestSource::new("ex1");
        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(async move { source.run(cancel_clone, tx).await });

        let mut seen = Vec::new();
        for _ in 0..PAIRS.len() {
            let update = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("update within 2s")
                .expect("channel open");
            assert_eq!(update.exchange, "ex1");
            seen.push(update.pair);
        }
        assert_eq!(seen.len(), PAIRS.len());

        cancel.cancel();
        let outcome = handle.await.unwrap();
        assert_eq!(outcome, SourceOutcome::Cancelled);
    }

    #[test]
    fn random_price_stays_within_two_percent() {
        for _ in 0..1000 {
            let p = TestSource::random_price("BTCUSDT");
            assert!(p >= 60_000.0 * 0.98 && p <= 60_000.0 * 1.02);
        }
    }
}
