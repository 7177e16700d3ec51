//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use eduverse_core::gateway::Gateway;
use eduverse_core::history::DailyHistoryService;
use eduverse_core::ports::UserDirectory;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Gateway,
    pub history: DailyHistoryService,
    pub users: Arc<dyn UserDirectory>,
}
