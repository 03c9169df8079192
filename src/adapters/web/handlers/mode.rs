//! `POST /mode/test`, `POST /mode/live`: drive `ModeManager.Start` with
//! the named mode, reusing the shared sink rather than a fresh channel.

use std::sync::Arc;

use axum::extract::{Path, State};
use serde::Serialize;

use crate::adapters::web::state::AppState;
use crate::adapters::web::types::{ApiError, ApiResult, ok};
use crate::app::mode::Mode;

#[derive(Serialize)]
pub struct ModeSwitchResponse {
    pub mode: String,
}

pub async fn switch_mode(State(state): State<Arc<AppState>>, Path(mode): Path<String>) -> ApiResult<ModeSwitchResponse> {
    let mode = Mode::parse(&mode).map_err(ApiError::from)?;

    state
        .mode_manager
        .start(state.sink.clone(), mode)
        .await
        .map_err(ApiError::from)?;

    ok(ModeSwitchResponse { mode: mode.as_str().to_string() })
}
