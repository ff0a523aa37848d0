//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use devstack_core::ports::{DraftAnswerService, ForumStore};

use crate::config::Config;

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ForumStore>,
    pub drafts: Arc<dyn DraftAnswerService>,
    pub config: Arc<Config>,
}
