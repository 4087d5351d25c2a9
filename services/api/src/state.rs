//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources, most importantly the conversation registry that owns
//! every live agent connection.

use crate::config::Config;
use preceptor_convai::{ConversationRegistry, WsOpener};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConversationRegistry<WsOpener>>,
    pub config: Arc<Config>,
}
