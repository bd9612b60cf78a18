//! OAuth token issuance, refresh, connectivity probing, and serialized
//! mutation of the per-user device document.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, OwnedMutexGuard};
use url::Url;

use crate::config::Config;
use crate::error::AppError;
use crate::models::device::{DeviceBinding, DeviceDocument, DeviceType};
use crate::models::session::{DeviceStatus, Session};
use crate::repositories::DeviceRepositoryTrait;
use crate::services::session_bridge::SessionBridge;

/// Per-user critical sections for device-document writes and token refresh.
///
/// Rapid add-then-delete submissions used to apply out of order through the
/// read-modify-write of the JSONB document; every mutation now runs under the
/// owning user's lock, with the store's version check guarding against other
/// processes.
#[derive(Clone, Default)]
pub struct DeviceLockRegistry {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl DeviceLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, username: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // A count of 1 means only the map still holds the lock: no guard
            // is out and nobody is waiting. Evicting here keeps the map
            // bounded by the set of users with an active mutation.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(username.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

/// Token pair returned by the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProviderTokens {
    pub fn into_binding(self) -> DeviceBinding {
        DeviceBinding {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            provider_fields: self.extra,
        }
    }
}

/// Outcome of `begin_authorization`: either the browser must be sent to the
/// provider, or a key-based device was linked on the spot.
#[derive(Debug)]
pub enum AuthorizationStart {
    Redirect(Url),
    Linked(DeviceDocument),
}

pub struct DeviceTokenService {
    http: reqwest::Client,
    config: Config,
    devices: Arc<dyn DeviceRepositoryTrait>,
    bridge: Arc<SessionBridge>,
    locks: DeviceLockRegistry,
}

impl DeviceTokenService {
    pub fn new(
        http: reqwest::Client,
        config: Config,
        devices: Arc<dyn DeviceRepositoryTrait>,
        bridge: Arc<SessionBridge>,
        locks: DeviceLockRegistry,
    ) -> Self {
        Self {
            http,
            config,
            devices,
            bridge,
            locks,
        }
    }

    /// Starts linking a device. Redirect-based providers delegate to the
    /// session bridge; key-based entry probes the key and writes the binding
    /// directly.
    pub async fn begin_authorization(
        &self,
        session: &Session,
        device_type: DeviceType,
        api_key: Option<&str>,
    ) -> Result<AuthorizationStart, AppError> {
        match api_key {
            Some(key) => {
                if !device_type.supports_probe() {
                    return Err(AppError::BadRequest(format!(
                        "Device type {} is not supported for linking",
                        device_type
                    )));
                }
                if !self.test_connection(device_type, key).await {
                    return Err(AppError::Unauthorized(
                        "Device key failed the connectivity probe".to_string(),
                    ));
                }
                let document = self
                    .store_binding(
                        &session.username,
                        device_type,
                        DeviceBinding::from_access_token(key),
                    )
                    .await?;
                Ok(AuthorizationStart::Linked(document))
            }
            None => {
                if !device_type.supports_oauth() {
                    return Err(AppError::BadRequest(format!(
                        "Device type {} does not support OAuth linking",
                        device_type
                    )));
                }
                let (_token, url) = self
                    .bridge
                    .begin_external_redirect(session, device_type)
                    .await?;
                Ok(AuthorizationStart::Redirect(url))
            }
        }
    }

    /// Finishes a redirect-based link: exchanges the authorization code, then
    /// consumes the correlation token and persists the binding under the
    /// restored user's lock.
    pub async fn complete_link(
        &self,
        code: &str,
        state_token: &str,
    ) -> Result<(Session, DeviceType), AppError> {
        let tokens = self.exchange_code(code).await?;
        let restored = self.bridge.complete_external_redirect(state_token).await?;

        self.store_binding(
            &restored.session.username,
            restored.device_type,
            tokens.into_binding(),
        )
        .await?;

        Ok((restored.session, restored.device_type))
    }

    /// Exchanges an authorization code for tokens. Any non-success status
    /// from the provider surfaces as `Provider` with the provider's body.
    pub async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, AppError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.oura_client_id.as_str()),
            ("client_secret", self.config.oura_client_secret.as_str()),
            ("redirect_uri", self.config.oura_redirect_uri.as_str()),
        ];
        self.token_request(&params, false).await
    }

    /// Exchanges the stored refresh token for a new token pair and persists
    /// it. Serialized per user: a duplicate in-flight exchange would
    /// invalidate the rotated refresh token and produce a false
    /// `ExpiredCredential`.
    pub async fn refresh(
        &self,
        username: &str,
        device_type: DeviceType,
    ) -> Result<ProviderTokens, AppError> {
        let _guard = self.locks.acquire(username).await;

        let current = self.devices.load_document(username).await?;
        let binding = current.document.get(device_type).ok_or_else(|| {
            AppError::NotFound(format!("No {} binding for this user", device_type))
        })?;
        let refresh_token = binding.refresh_token.clone().ok_or_else(|| {
            AppError::ExpiredCredential(
                "No refresh token stored; re-authorize the device".to_string(),
            )
        })?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.config.oura_client_id.as_str()),
            ("client_secret", self.config.oura_client_secret.as_str()),
        ];
        let tokens = self.token_request(&params, true).await?;

        let binding = tokens.clone().into_binding();
        self.mutate_with_retry(username, &|document: &mut DeviceDocument| {
            document.insert(device_type, binding.clone());
        })
        .await?;

        Ok(tokens)
    }

    /// Lightweight read-only probe. Network or auth failure is ordinary
    /// "disconnected" state, never an error. A stalled provider is bounded
    /// by the configured timeout; login probes every binding and must not
    /// hang on one of them.
    pub async fn test_connection(&self, device_type: DeviceType, access_token: &str) -> bool {
        if !device_type.supports_probe() {
            return false;
        }
        match self
            .http
            .get(&self.config.oura_probe_url)
            .bearer_auth(access_token)
            .timeout(self.provider_timeout())
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::debug!(device_type = %device_type, error = %err, "connectivity probe failed");
                false
            }
        }
    }

    /// Probes every binding in `document` and reports per-device status.
    pub async fn probe_statuses(&self, document: &DeviceDocument) -> Vec<DeviceStatus> {
        let mut statuses = Vec::new();
        for device_type in document.device_types() {
            let connected = match document.get(device_type) {
                Some(binding) => self.test_connection(device_type, &binding.access_token).await,
                None => false,
            };
            statuses.push(DeviceStatus {
                device_type,
                connected,
            });
        }
        statuses
    }

    pub async fn load_document(&self, username: &str) -> Result<DeviceDocument, AppError> {
        Ok(self.devices.load_document(username).await?.document)
    }

    pub async fn store_binding(
        &self,
        username: &str,
        device_type: DeviceType,
        binding: DeviceBinding,
    ) -> Result<DeviceDocument, AppError> {
        let _guard = self.locks.acquire(username).await;
        self.mutate_with_retry(username, &|document: &mut DeviceDocument| {
            document.insert(device_type, binding.clone());
        })
        .await
    }

    pub async fn remove_binding(
        &self,
        username: &str,
        device_type: DeviceType,
    ) -> Result<DeviceDocument, AppError> {
        let _guard = self.locks.acquire(username).await;
        self.mutate_with_retry(username, &|document: &mut DeviceDocument| {
            document.remove(device_type);
        })
        .await
    }

    /// Read-modify-write with one automatic retry on a version miss. The
    /// caller must hold the user's lock.
    async fn mutate_with_retry(
        &self,
        username: &str,
        apply: &(dyn Fn(&mut DeviceDocument) + Send + Sync),
    ) -> Result<DeviceDocument, AppError> {
        let mut current = self.devices.load_document(username).await?;
        apply(&mut current.document);
        if self
            .devices
            .store_document(username, &current.document, current.version)
            .await?
        {
            return Ok(current.document);
        }

        tracing::warn!(username, "device document version miss; retrying with fresh state");
        let mut fresh = self.devices.load_document(username).await?;
        apply(&mut fresh.document);
        if self
            .devices
            .store_document(username, &fresh.document, fresh.version)
            .await?
        {
            return Ok(fresh.document);
        }

        Err(AppError::ConcurrentMutationConflict(
            "Device document changed concurrently; retry the request".to_string(),
        ))
    }

    fn provider_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.provider_timeout_secs)
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        refresh_grant: bool,
    ) -> Result<ProviderTokens, AppError> {
        let response = self
            .http
            .post(&self.config.oura_token_url)
            .form(params)
            .timeout(self.provider_timeout())
            .send()
            .await
            .map_err(|e| {
                AppError::InternalServerError(anyhow::anyhow!(
                    "Failed to reach token endpoint: {}",
                    e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            // 400/401 on a refresh grant means the refresh token itself was
            // rejected: the binding needs full re-authorization, not a retry.
            if refresh_grant && (status.as_u16() == 400 || status.as_u16() == 401) {
                return Err(AppError::ExpiredCredential(format!(
                    "Refresh token rejected by provider: {}",
                    detail
                )));
            }
            return Err(AppError::Provider {
                status: status.as_u16(),
                detail,
            });
        }

        response.json::<ProviderTokens>().await.map_err(|e| {
            AppError::InternalServerError(anyhow::anyhow!("Malformed token response: {}", e))
        })
    }
}
