//! `GET /prices/latest/...`, `GET /prices/{highest,lowest,average}/...`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapters::web::state::AppState;
use crate::adapters::web::types::{ApiError, ApiResult, ok};
use crate::domain::models::PriceStats;

#[derive(Deserialize)]
pub struct PeriodQuery {
    period: Option<String>,
}

fn parse_period(q: &PeriodQuery) -> Result<chrono::Duration, ApiError> {
    let raw = q.period.as_deref().unwrap_or("1h");
    let std_dur = humantime::parse_duration(raw)
        .map_err(|e| ApiError::bad_request(format!("invalid period {raw:?}: {e}")))?;
    chrono::Duration::from_std(std_dur).map_err(|e| ApiError::bad_request(e.to_string()))
}

#[derive(Serialize)]
pub struct LatestPriceResponse {
    pub exchange: String,
    pub pair: String,
    pub price: f64,
    pub time: DateTime<Utc>,
    /// Set when this response fell back to the repository's windowed
    /// average rather than a cache hit.
    pub from_store_average: bool,
}

/// `GET /prices/latest/{symbol}` — latest across no particular exchange
/// is not defined by the cache schema, so this variant probes the cache
/// under every exchange this process currently knows is active; callers
/// wanting a specific exchange should use the two-segment route.
pub async fn latest_by_pair(State(state): State<Arc<AppState>>, Path(pair): Path<String>) -> ApiResult<LatestPriceResponse> {
    latest_for(&state, None, &pair).await
}

pub async fn latest_by_exchange_and_pair(
    State(state): State<Arc<AppState>>,
    Path((exchange, pair)): Path<(String, String)>,
) -> ApiResult<LatestPriceResponse> {
    latest_for(&state, Some(exchange), &pair).await
}

async fn latest_for(state: &AppState, exchange: Option<String>, pair: &str) -> ApiResult<LatestPriceResponse> {
    let exchange = exchange.unwrap_or_else(|| DEFAULT_EXCHANGE.to_string());

    match state.cache.get_latest(&exchange, pair).await {
        Ok(Some(update)) => {
            return ok(LatestPriceResponse {
                exchange: update.exchange,
                pair: update.pair,
                price: update.price,
                time: update.time,
                from_store_average: false,
            });
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "cache read failed, falling back to store"),
    }

    // Fallback path: `stats.average` is a window average, not a last
    // trade, surfaced under the `price` field only for compatibility.
    let stats = state.repository.get_latest(&exchange, pair).await.map_err(ApiError::from)?;
    ok(LatestPriceResponse {
        exchange: stats.exchange,
        pair: stats.pair,
        price: stats.average,
        time: stats.timestamp,
        from_store_average: true,
    })
}

#[derive(Serialize)]
pub struct AggregateResponse {
    pub exchange: String,
    pub pair: String,
    pub value: f64,
    pub samples: usize,
}

async fn rows_for(state: &AppState, exchange: &str, pair: &str, q: &PeriodQuery) -> Result<Vec<PriceStats>, ApiError> {
    let period = parse_period(q)?;
    let rows = state.repository.get_by_period(exchange, pair, period).await.map_err(ApiError::from)?;
    if rows.is_empty() {
        return Err(ApiError::not_found(format!("no stats for {exchange}:{pair} in the requested period")));
    }
    Ok(rows)
}

/// Default exchange used by the single-segment `/prices/{kind}/{symbol}`
/// routes, mirroring `latest_by_pair`'s fallback.
const DEFAULT_EXCHANGE: &str = "ex1";

pub async fn highest_by_pair(
    State(state): State<Arc<AppState>>,
    Path(pair): Path<String>,
    Query(q): Query<PeriodQuery>,
) -> ApiResult<AggregateResponse> {
    highest_for(&state, DEFAULT_EXCHANGE.to_string(), pair, &q).await
}

pub async fn highest(
    State(state): State<Arc<AppState>>,
    Path((exchange, pair)): Path<(String, String)>,
    Query(q): Query<PeriodQuery>,
) -> ApiResult<AggregateResponse> {
    highest_for(&state, exchange, pair, &q).await
}

async fn highest_for(state: &AppState, exchange: String, pair: String, q: &PeriodQuery) -> ApiResult<AggregateResponse> {
    let rows = rows_for(state, &exchange, &pair, q).await?;
    let value = rows.iter().map(|r| r.max).fold(f64::MIN, f64::max);
    ok(AggregateResponse { exchange, pair, value, samples: rows.len() })
}

pub async fn lowest_by_pair(
    State(state): State<Arc<AppState>>,
    Path(pair): Path<String>,
    Query(q): Query<PeriodQuery>,
) -> ApiResult<AggregateResponse> {
    lowest_for(&state, DEFAULT_EXCHANGE.to_string(), pair, &q).await
}

pub async fn lowest(
    State(state): State<Arc<AppState>>,
    Path((exchange, pair)): Path<(String, String)>,
    Query(q): Query<PeriodQuery>,
) -> ApiResult<AggregateResponse> {
    lowest_for(&state, exchange, pair, &q).await
}

async fn lowest_for(state: &AppState, exchange: String, pair: String, q: &PeriodQuery) -> ApiResult<AggregateResponse> {
    let rows = rows_for(state, &exchange, &pair, q).await?;
    let value = rows.iter().map(|r| r.min).fold(f64::MAX, f64::min);
    ok(AggregateResponse { exchange, pair, value, samples: rows.len() })
}

pub async fn average_by_pair(
    State(state): State<Arc<AppState>>,
    Path(pair): Path<String>,
    Query(q): Query<PeriodQuery>,
) -> ApiResult<AggregateResponse> {
    average_for(&state, DEFAULT_EXCHANGE.to_string(), pair, &q).await
}

pub async fn average(
    State(state): State<Arc<AppState>>,
    Path((exchange, pair)): Path<(String, String)>,
    Query(q): Query<PeriodQuery>,
) -> ApiResult<AggregateResponse> {
    average_for(&state, exchange, pair, &q).await
}

async fn average_for(state: &AppState, exchange: String, pair: String, q: &PeriodQuery) -> ApiResult<AggregateResponse> {
    let rows = rows_for(state, &exchange, &pair, q).await?;
    let sum: f64 = rows.iter().map(|r| r.average).sum();
    let value = sum / rows.len() as f64;
    ok(AggregateResponse { exchange, pair, value, samples: rows.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::mode::ModeManager;
    use crate::domain::models::PriceUpdate;
    use crate::error::{CacheError, StoreError};
    use async_trait::async_trait;
    use axum::Json;
    use tokio_util::sync::CancellationToken;

    /// Cache that always misses, forcing the repository fallback path.
    struct MissingCache;

    #[async_trait]
    impl crate::domain::ports::Cache for MissingCache {
        async fn set_latest(&self, _update: &PriceUpdate) -> Result<(), CacheError> {
            Ok(())
        }
        async fn get_latest(&self, _exchange: &str, _pair: &str) -> Result<Option<PriceUpdate>, CacheError> {
            Ok(None)
        }
        async fn clean_old(&self, _pattern: &str) -> Result<(), CacheError> {
            Ok(())
        }
    }

    struct StubRepository {
        stats: PriceStats,
    }

    #[async_trait]
    impl crate::domain::ports::PriceRepository for StubRepository {
        async fn store_stats_batch(&self, _stats: &[PriceStats]) -> Result<(), StoreError> {
            Ok(())
        }
        async fn get_latest(&self, _exchange: &str, _pair: &str) -> Result<PriceStats, StoreError> {
            Ok(self.stats.clone())
        }
        async fn get_by_period(
            &self,
            _exchange: &str,
            _pair: &str,
            _period: chrono::Duration,
        ) -> Result<Vec<PriceStats>, StoreError> {
            Ok(vec![self.stats.clone()])
        }
    }

    fn test_state(cache: MissingCache, repository: StubRepository) -> AppState {
        let mode_manager = Arc::new(ModeManager::new(vec![], CancellationToken::new()));
        let (sink, _rx) = tokio::sync::mpsc::channel(1);
        AppState::new(mode_manager, sink, Arc::new(cache), Arc::new(repository))
    }

    /// S5: with the cache disabled (always a miss), `GetLatest` falls back
    /// to the repository's most recent `PriceStats` and surfaces its
    /// `average` under `price`, tagged `from_store_average: true`.
    #[tokio::test]
    async fn latest_falls_back_to_store_average_on_cache_miss() {
        let ts = Utc::now();
        let stats = PriceStats { exchange: "exA".into(), pair: "P1".into(), timestamp: ts, average: 42.5, min: 40.0, max: 45.0 };
        let state = test_state(MissingCache, StubRepository { stats: stats.clone() });

        let result = latest_for(&state, Some("exA".to_string()), "P1").await;
        let (status, Json(body)) = result.expect("fallback succeeds");
        assert_eq!(status, axum::http::StatusCode::OK);
        let data = body.data.expect("data present");
        assert_eq!(data.price, 42.5);
        assert_eq!(data.time, ts);
        assert!(data.from_store_average);
    }
}
