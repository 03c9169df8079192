//! Trait boundaries between the pipeline core and its storage/source adapters.

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::models::{PriceStats, PriceUpdate};
use crate::error::{CacheError, SourceError, StoreError};

/// Terminal status returned by a source's `run` loop. Matches the
/// `{cancelled, fatal-error}` pair specified for `ExchangeSource::Start`;
/// `Stop()` is a separate, idempotent side channel that also resolves to
/// `Cancelled` once observed by the running loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// The cancellation token fired, or `stop()` was called; clean exit.
    Cancelled,
    /// An unrecoverable error ended the loop.
    Fatal(SourceErrorKind),
}

/// Coarse error classification surfaced by a source without borrowing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceErrorKind {
    Connect,
    Read,
}

impl From<&SourceError> for SourceErrorKind {
    fn from(e: &SourceError) -> Self {
        match e {
            SourceError::Connect(_) => SourceErrorKind::Connect,
            SourceError::Read(_) => SourceErrorKind::Read,
        }
    }
}

/// Produces a lazy, unbounded sequence of `PriceUpdate`s into `sink` until
/// cancelled or stopped. Two variants implement this: `TestSource` and
/// `LiveSource`.
#[async_trait]
pub trait ExchangeSource: Send + Sync {
    /// The exchange identifier this source produces updates under.
    fn label(&self) -> &str;

    /// Run until `cancel` fires or `stop()` is called; never drops a
    /// successfully parsed update except on cancellation.
    async fn run(&self, cancel: CancellationToken, sink: mpsc::Sender<PriceUpdate>) -> SourceOutcome;

    /// Request graceful termination. Idempotent.
    fn stop(&self);
}

/// Hot key-value cache holding the latest update per (exchange, pair).
#[async_trait]
pub trait Cache: Send + Sync {
    /// Upsert `latest:{exchange}:{pair}` with the configured TTL.
    async fn set_latest(&self, update: &PriceUpdate) -> Result<(), CacheError>;

    /// Fetch the stored update, or `Ok(None)` on a cache miss.
    async fn get_latest(&self, exchange: &str, pair: &str) -> Result<Option<PriceUpdate>, CacheError>;

    /// Best-effort bulk delete of keys matching `pattern`.
    async fn clean_old(&self, pattern: &str) -> Result<(), CacheError>;
}

/// Durable store for flushed window statistics.
#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// Transactional insert with conflict policy "skip on duplicate key".
    async fn store_stats_batch(&self, stats: &[PriceStats]) -> Result<(), StoreError>;

    /// Most recent row by `timestamp desc`. Fails with `StoreError::NotFound`
    /// if no row exists for the pair.
    async fn get_latest(&self, exchange: &str, pair: &str) -> Result<PriceStats, StoreError>;

    /// Rows with `timestamp >= now() - period`, ascending.
    async fn get_by_period(
        &self,
        exchange: &str,
        pair: &str,
        period: Duration,
    ) -> Result<Vec<PriceStats>, StoreError>;
}
