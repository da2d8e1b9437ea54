//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::token::JwtCodec;
use shop_core::ports::{CacheService, MailService, MediaStorage, PolicyEnforcer};
use shop_core::usecase::Repositories;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub cache: Arc<dyn CacheService>,
    pub mailer: Arc<dyn MailService>,
    pub media: Arc<dyn MediaStorage>,
    pub policy: Arc<dyn PolicyEnforcer>,
    pub tokens: JwtCodec,
    pub config: Arc<Config>,
}
