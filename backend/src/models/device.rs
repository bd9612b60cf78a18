//! Wearable device bindings and the persisted device document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

/// Supported wearable integrations.
///
/// Wire values match the keys of the persisted device document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum DeviceType {
    #[serde(rename = "Oura Ring", alias = "OuraRing")]
    OuraRing,
    #[serde(rename = "Apple Watch", alias = "AppleWatch")]
    AppleWatch,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::OuraRing => "Oura Ring",
            DeviceType::AppleWatch => "Apple Watch",
        }
    }

    /// Whether linking this device goes through the provider's redirect-based
    /// OAuth flow. Key-based entry (a personal access token) is accepted for
    /// any supported device that exposes a data API.
    pub fn supports_oauth(&self) -> bool {
        matches!(self, DeviceType::OuraRing)
    }

    /// Whether the backend can probe this device's API at all. The Apple
    /// Watch has no server-side API yet; its probe is always "disconnected".
    pub fn supports_probe(&self) -> bool {
        matches!(self, DeviceType::OuraRing)
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored credential set associating one user with one linked integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceBinding {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Provider-specific metadata (token type, expiry, scope, ...), kept
    /// verbatim so a re-serialized document matches what the provider sent.
    #[serde(flatten)]
    pub provider_fields: Map<String, Value>,
}

impl DeviceBinding {
    pub fn from_access_token(access_token: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: None,
            provider_fields: Map::new(),
        }
    }
}

/// The per-user JSONB document: `{ "<deviceType>": { "accessToken": ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceDocument(pub BTreeMap<String, DeviceBinding>);

impl DeviceDocument {
    pub fn get(&self, device_type: DeviceType) -> Option<&DeviceBinding> {
        self.0.get(device_type.as_str())
    }

    pub fn insert(&mut self, device_type: DeviceType, binding: DeviceBinding) {
        self.0.insert(device_type.as_str().to_string(), binding);
    }

    pub fn remove(&mut self, device_type: DeviceType) -> Option<DeviceBinding> {
        self.0.remove(device_type.as_str())
    }

    pub fn device_types(&self) -> Vec<DeviceType> {
        self.0
            .keys()
            .filter_map(|key| serde_json::from_value(Value::String(key.clone())).ok())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeviceActionKind {
    Add,
    Delete,
}

/// Payload of `POST /api/devices/action`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DeviceAction {
    pub action: DeviceActionKind,
    pub device_type: DeviceType,
    /// Personal access token for key-based linking; absent for OAuth linking.
    #[validate(length(min = 16, message = "api key is too short"))]
    pub api_key: Option<String>,
}
