use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use super::handlers::{health, mode, prices};
use super::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/prices/latest/{symbol}", get(prices::latest_by_pair))
        .route("/prices/latest/{exchange}/{symbol}", get(prices::latest_by_exchange_and_pair))
        .route("/prices/highest/{symbol}", get(prices::highest_by_pair))
        .route("/prices/highest/{exchange}/{symbol}", get(prices::highest))
        .route("/prices/lowest/{symbol}", get(prices::lowest_by_pair))
        .route("/prices/lowest/{exchange}/{symbol}", get(prices::lowest))
        .route("/prices/average/{symbol}", get(prices::average_by_pair))
        .route("/prices/average/{exchange}/{symbol}", get(prices::average))
        .route("/mode/{mode}", post(mode::switch_mode))
        .route("/health", get(health::health_check))
        .with_state(state)
}
