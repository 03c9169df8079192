//! PostgreSQL-backed durable store for flushed window statistics.
//!
//! Uses raw `sqlx::query(...).bind(...)` throughout rather than the
//! compile-time `sqlx::query!` macros, since those require a live
//! `DATABASE_URL` at build time.

use async_trait::async_trait;
use chrono::Duration;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use std::time::Duration as StdDuration;
use tracing::{info, warn};

use crate::domain::models::PriceStats;
use crate::domain::ports::PriceRepository;
use crate::error::StoreError;

pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(StdDuration::from_secs(5))
            .connect(connection_string)
            .await?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS price_stats (
                id BIGSERIAL PRIMARY KEY,
                pair_name TEXT NOT NULL,
                exchange TEXT NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL,
                average_price DOUBLE PRECISION NOT NULL,
                min_price DOUBLE PRECISION NOT NULL,
                max_price DOUBLE PRECISION NOT NULL,
                UNIQUE (pair_name, exchange, timestamp)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("price_stats schema ensured");
        Ok(())
    }
}

#[async_trait]
impl PriceRepository for PostgresRepository {
    async fn store_stats_batch(&self, stats: &[PriceStats]) -> Result<(), StoreError> {
        if stats.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for s in stats {
            sqlx::query(
                r#"
                INSERT INTO price_stats (pair_name, exchange, timestamp, average_price, min_price, max_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (pair_name, exchange, timestamp) DO NOTHING
                "#,
            )
            .bind(&s.pair)
            .bind(&s.exchange)
            .bind(s.timestamp)
            .bind(s.average)
            .bind(s.min)
            .bind(s.max)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_latest(&self, exchange: &str, pair: &str) -> Result<PriceStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT exchange, pair_name, timestamp, average_price, min_price, max_price
            FROM price_stats
            WHERE exchange = $1 AND pair_name = $2
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(exchange)
        .bind(pair)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(StoreError::NotFound {
                exchange: exchange.to_string(),
                pair: pair.to_string(),
            });
        };

        Ok(PriceStats {
            exchange: row.try_get("exchange")?,
            pair: row.try_get("pair_name")?,
            timestamp: row.try_get("timestamp")?,
            average: row.try_get("average_price")?,
            min: row.try_get("min_price")?,
            max: row.try_get("max_price")?,
        })
    }

    async fn get_by_period(
        &self,
        exchange: &str,
        pair: &str,
        period: Duration,
    ) -> Result<Vec<PriceStats>, StoreError> {
        let period_seconds = period.num_seconds();

        let rows = sqlx::query(
            r#"
            SELECT exchange, pair_name, timestamp, average_price, min_price, max_price
            FROM price_stats
            WHERE exchange = $1 AND pair_name = $2 AND timestamp >= now() - ($3 * interval '1 second')
            ORDER BY timestamp ASC
            "#,
        )
        .bind(exchange)
        .bind(pair)
        .bind(period_seconds)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(PriceStats {
                exchange: row.try_get("exchange")?,
                pair: row.try_get("pair_name")?,
                timestamp: row.try_get("timestamp")?,
                average: row.try_get("average_price")?,
                min: row.try_get("min_price")?,
                max: row.try_get("max_price")?,
            });
        }

        if out.is_empty() {
            warn!(exchange, pair, "get_by_period returned no rows");
        }
        Ok(out)
    }
}
