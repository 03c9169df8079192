//! Axum HTTP query surface: latest/highest/lowest/average price queries,
//! mode switching, and a health probe.

pub mod handlers;
pub mod router;
pub mod state;
pub mod types;

pub use router::build_router;
pub use state::AppState;
