use std::sync::Arc;

use crate::config::Config;
use crate::repositories::UserRepositoryTrait;
use crate::services::{AgentClient, ChatHistoryService, DeviceTokenService, SessionBridge};

/// Shared application state, assembled once at startup and cloned per
/// request. Repositories and services are held behind trait objects so tests
/// can swap in in-memory implementations.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserRepositoryTrait>,
    pub bridge: Arc<SessionBridge>,
    pub device_tokens: Arc<DeviceTokenService>,
    pub chat_history: Arc<ChatHistoryService>,
    pub agent: Arc<AgentClient>,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserRepositoryTrait>,
        bridge: Arc<SessionBridge>,
        device_tokens: Arc<DeviceTokenService>,
        chat_history: Arc<ChatHistoryService>,
        agent: Arc<AgentClient>,
    ) -> Self {
        Self {
            config,
            users,
            bridge,
            device_tokens,
            chat_history,
            agent,
        }
    }
}
