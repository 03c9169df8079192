//! Health probe: checks cache and store reachability without exposing
//! internal error detail.

use std::sync::Arc;

use axum::extract::State;
use serde::Serialize;

use crate::adapters::web::state::AppState;
use crate::adapters::web::types::ApiResponse;

#[derive(Serialize)]
pub struct DependencyHealth {
    pub cache: &'static str,
    pub store: &'static str,
    pub build: &'static str,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> axum::Json<ApiResponse<DependencyHealth>> {
    let cache_ok = state.cache.get_latest("__health__", "__probe__").await.is_ok();
    let store_ok = state.repository.get_by_period("__health__", "__probe__", chrono::Duration::seconds(1)).await.is_ok();

    let health = DependencyHealth {
        cache: if cache_ok { "ok" } else { "unavailable" },
        store: if store_ok { "ok" } else { "unavailable" },
        build: env!("GIT_HASH"),
    };
    axum::Json(ApiResponse::success(health))
}
