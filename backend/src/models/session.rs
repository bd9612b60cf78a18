//! The per-request session snapshot.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::device::DeviceType;

/// Ephemeral caller state, rehydrated from the signed session cookie on every
/// request. Mutations are observable only if flushed as a fresh cookie before
/// the response is finalized; once headers are committed (as happens
/// immediately when streaming starts) further writes are lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub username: String,
    pub authenticated: bool,
    /// Connectivity snapshot per linked device, refreshed at login and after
    /// link/unlink mutations.
    #[serde(default)]
    pub device_statuses: Vec<DeviceStatus>,
    /// Cached conversation turns, used as context for the reasoning backend.
    #[serde(default)]
    pub chat_cache: ChatCache,
    /// Log identifier of the most recent completed turn; feedback applies to it.
    #[serde(default)]
    pub last_log_id: Option<i64>,
}

impl Session {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            authenticated: true,
            device_statuses: Vec::new(),
            chat_cache: ChatCache::default(),
            last_log_id: None,
        }
    }

    pub fn set_device_status(&mut self, device_type: DeviceType, connected: bool) {
        if let Some(status) = self
            .device_statuses
            .iter_mut()
            .find(|s| s.device_type == device_type)
        {
            status.connected = connected;
        } else {
            self.device_statuses.push(DeviceStatus {
                device_type,
                connected,
            });
        }
    }

    pub fn remove_device_status(&mut self, device_type: DeviceType) {
        self.device_statuses
            .retain(|s| s.device_type != device_type);
    }

    pub fn push_turn(&mut self, query: String, response: String, log_id: Option<i64>) {
        self.chat_cache.queries.push(query);
        self.chat_cache.responses.push(response);
        if log_id.is_some() {
            self.last_log_id = log_id;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceStatus {
    pub device_type: DeviceType,
    pub connected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatCache {
    pub queries: Vec<String>,
    pub responses: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_device_status_upserts() {
        let mut session = Session::new("nik");
        session.set_device_status(DeviceType::OuraRing, false);
        session.set_device_status(DeviceType::OuraRing, true);
        assert_eq!(session.device_statuses.len(), 1);
        assert!(session.device_statuses[0].connected);
    }

    #[test]
    fn push_turn_keeps_last_log_id_when_absent() {
        let mut session = Session::new("nik");
        session.push_turn("q1".into(), "r1".into(), Some(7));
        session.push_turn("q2".into(), "r2".into(), None);
        assert_eq!(session.last_log_id, Some(7));
        assert_eq!(session.chat_cache.queries, vec!["q1", "q2"]);
    }
}
