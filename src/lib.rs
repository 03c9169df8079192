//! MarketFlow — real-time multi-exchange price ingestion, windowed
//! aggregation and a small query API.
//!
//! # Modules
//!
//! - [`domain`] - Core value types (`PriceUpdate`, `PriceStats`) and the
//!   port traits (`ExchangeSource`, `Cache`, `PriceRepository`) adapters
//!   implement.
//! - [`adapters`] - Concrete sources (TCP live feed, synthetic test
//!   generator), the Redis cache, the Postgres repository, and the Axum
//!   HTTP surface.
//! - [`app`] - Pipeline orchestration: mode switching, the fan-out
//!   dispatcher and worker pool, the tumbling-window aggregator, and the
//!   `PriceService` facade wiring them together.
//! - [`config`] - Environment-driven startup configuration.
//! - [`logging`] - `tracing` initialization.
//! - [`error`] - Per-concern error enums.

pub mod adapters;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::AppConfig;
pub use domain::{Cache, ExchangeSource, PriceRepository, PriceStats, PriceUpdate};
