//! Shared application state handed to every handler.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::app::mode::ModeManager;
use crate::domain::models::PriceUpdate;
use crate::domain::ports::{Cache, PriceRepository};

#[derive(Clone)]
pub struct AppState {
    pub mode_manager: Arc<ModeManager>,
    /// The shared fan-in sink, reused (never re-allocated) across mode
    /// switches triggered via the HTTP surface.
    pub sink: mpsc::Sender<PriceUpdate>,
    pub cache: Arc<dyn Cache>,
    pub repository: Arc<dyn PriceRepository>,
}

impl AppState {
    pub fn new(
        mode_manager: Arc<ModeManager>,
        sink: mpsc::Sender<PriceUpdate>,
        cache: Arc<dyn Cache>,
        repository: Arc<dyn PriceRepository>,
    ) -> Self {
        Self { mode_manager, sink, cache, repository }
    }
}
