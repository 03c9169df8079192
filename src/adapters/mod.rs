//! Concrete implementations of the `domain::ports` traits, plus the HTTP
//! surface that sits in front of them.

pub mod cache;
pub mod exchange;
pub mod postgres;
pub mod web;

pub use cache::RedisCache;
pub use postgres::PostgresRepository;
