//! Core domain types and the port traits adapters implement.

pub mod models;
pub mod ports;

pub use models::{PriceStats, PriceUpdate};
pub use ports::{Cache, ExchangeSource, PriceRepository, SourceErrorKind, SourceOutcome};
