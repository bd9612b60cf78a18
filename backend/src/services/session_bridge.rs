//! Session continuity across the external authorization redirect.
//!
//! The authorization hop leaves the application's origin; the browser's
//! session cookie may not be presented on the way back under the provider's
//! redirect/cookie policy. Continuity is restored through a server-held,
//! one-shot correlation record instead of relying on cookie survival.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::error::AppError;
use crate::models::device::DeviceType;
use crate::models::link::{transition, LinkEvent, LinkState};
use crate::models::session::Session;
use crate::repositories::OauthStateRepositoryTrait;
use crate::utils::random::generate_state_token;

/// What gets stashed while the browser is away at the provider.
#[derive(Debug, Serialize, Deserialize)]
struct LinkStash {
    link_state: LinkState,
    device_type: DeviceType,
    session: Session,
}

/// Outcome of a consumed correlation token: the rehydrated session for the
/// caller to adopt, plus the device the flow was linking.
#[derive(Debug)]
pub struct RestoredLink {
    pub session: Session,
    pub device_type: DeviceType,
}

pub struct SessionBridge {
    states: Arc<dyn OauthStateRepositoryTrait>,
    config: Config,
}

impl SessionBridge {
    pub fn new(states: Arc<dyn OauthStateRepositoryTrait>, config: Config) -> Self {
        Self { states, config }
    }

    /// Serializes `session`, stores it keyed by a fresh unguessable token,
    /// and returns the provider authorization URL embedding that token as the
    /// `state` parameter. One durable row per call.
    pub async fn begin_external_redirect(
        &self,
        session: &Session,
        device_type: DeviceType,
    ) -> Result<(String, Url), AppError> {
        let link_state = transition(LinkState::Idle, LinkEvent::AuthorizationStarted)
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e.to_string())))?;

        let token = generate_state_token();
        let stash = LinkStash {
            link_state,
            device_type,
            session: session.clone(),
        };
        self.states
            .insert_state(&token, serde_json::to_value(&stash)?)
            .await?;

        let url = self.authorize_url(&token)?;
        tracing::info!(
            username = %session.username,
            device_type = %device_type,
            "stashed session for external authorization"
        );
        Ok((token, url))
    }

    /// Looks up and atomically deletes the record for `token`, then drives
    /// the link flow to `Linked`. A missing record (unknown, expired, or
    /// already consumed) fails with `StateNotFound` — replays land here.
    pub async fn complete_external_redirect(&self, token: &str) -> Result<RestoredLink, AppError> {
        let snapshot = self
            .states
            .consume_state(token)
            .await?
            .ok_or(AppError::StateNotFound)?;

        let stash: LinkStash =
            serde_json::from_value(snapshot).map_err(|_| AppError::StateNotFound)?;

        // A stash in any state other than AwaitingExternalRedirect has no
        // valid path to Linked; treat it like a missing record.
        let state = transition(stash.link_state, LinkEvent::CallbackReceived)
            .and_then(|s| transition(s, LinkEvent::SessionRestored))
            .map_err(|_| AppError::StateNotFound)?;

        tracing::info!(
            username = %stash.session.username,
            device_type = %stash.device_type,
            link_state = ?state,
            "restored session from correlation token"
        );
        Ok(RestoredLink {
            session: stash.session,
            device_type: stash.device_type,
        })
    }

    /// Removes stashed sessions older than the configured TTL.
    pub async fn sweep_expired(&self) -> Result<u64, AppError> {
        self.states
            .delete_expired(Duration::minutes(self.config.oauth_state_ttl_minutes))
            .await
    }

    fn authorize_url(&self, state_token: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.config.oura_auth_url).map_err(|e| {
            AppError::InternalServerError(anyhow::anyhow!("Invalid authorize URL: {}", e))
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.oura_client_id)
            .append_pair("redirect_uri", &self.config.oura_redirect_uri)
            .append_pair("scope", "personal daily heartrate")
            .append_pair("state", state_token);
        Ok(url)
    }
}
