#![allow(dead_code)] // Each integration test binary uses a subset of this module.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use pulsy_backend::config::Config;
use pulsy_backend::error::AppError;
use pulsy_backend::models::chat::ChatRecord;
use pulsy_backend::models::device::DeviceDocument;
use pulsy_backend::models::user::User;
use pulsy_backend::repositories::{
    ChatLogRepositoryTrait, DeviceRepositoryTrait, OauthStateRepositoryTrait, UserRepositoryTrait,
    VersionedDocument,
};
use pulsy_backend::services::{
    AgentClient, ChatHistoryService, DeviceLockRegistry, DeviceTokenService, SessionBridge,
};
use pulsy_backend::state::AppState;

/// Config pointing at nothing real; tests that need a live endpoint override
/// the relevant URL with a locally bound listener.
pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused/test".to_string(),
        session_secret: "integration-test-secret".to_string(),
        session_expiration_hours: 1,
        oauth_state_ttl_minutes: 15,
        agent_base_url: "http://127.0.0.1:1".to_string(),
        oura_client_id: "test-client".to_string(),
        oura_client_secret: "test-secret".to_string(),
        oura_redirect_uri: "http://localhost:3000/api/link/callback".to_string(),
        oura_auth_url: "https://provider.test/oauth/authorize".to_string(),
        oura_token_url: "http://127.0.0.1:1/oauth/token".to_string(),
        oura_probe_url: "http://127.0.0.1:1/v2/usercollection/personal_info".to_string(),
        provider_timeout_secs: 1,
        cookie_secure: false,
    }
}

#[derive(Default)]
pub struct InMemoryOauthStateRepository {
    rows: Mutex<HashMap<String, (Value, DateTime<Utc>)>>,
}

impl InMemoryOauthStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Backdates a stored row so the expiry sweep picks it up.
    pub fn age_all(&self, by: Duration) {
        let mut rows = self.rows.lock().unwrap();
        for (_, created_at) in rows.values_mut() {
            *created_at -= by;
        }
    }
}

#[async_trait]
impl OauthStateRepositoryTrait for InMemoryOauthStateRepository {
    async fn insert_state(&self, token: &str, snapshot: Value) -> Result<(), AppError> {
        self.rows
            .lock()
            .unwrap()
            .insert(token.to_string(), (snapshot, Utc::now()));
        Ok(())
    }

    async fn consume_state(&self, token: &str) -> Result<Option<Value>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .remove(token)
            .map(|(snapshot, _)| snapshot))
    }

    async fn delete_expired(&self, ttl: Duration) -> Result<u64, AppError> {
        let cutoff = Utc::now() - ttl;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, (_, created_at)| *created_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }
}

/// Versioned document store that journals every successful write, so tests
/// can replay the write history and compare it against the final state.
#[derive(Default)]
pub struct InMemoryDeviceRepository {
    rows: Mutex<HashMap<String, (DeviceDocument, i64)>>,
    journal: Mutex<Vec<(String, DeviceDocument, i64)>>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> Vec<(String, DeviceDocument, i64)> {
        self.journal.lock().unwrap().clone()
    }

    pub fn version_of(&self, username: &str) -> i64 {
        self.rows
            .lock()
            .unwrap()
            .get(username)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    }
}

#[async_trait]
impl DeviceRepositoryTrait for InMemoryDeviceRepository {
    async fn load_document(&self, username: &str) -> Result<VersionedDocument, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(match rows.get(username) {
            Some((document, version)) => VersionedDocument {
                document: document.clone(),
                version: *version,
            },
            None => VersionedDocument::default(),
        })
    }

    async fn store_document(
        &self,
        username: &str,
        document: &DeviceDocument,
        expected_version: i64,
    ) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let current_version = rows.get(username).map(|(_, v)| *v).unwrap_or(0);
        if current_version != expected_version {
            return Ok(false);
        }
        let new_version = current_version + 1;
        rows.insert(username.to_string(), (document.clone(), new_version));
        self.journal
            .lock()
            .unwrap()
            .push((username.to_string(), document.clone(), new_version));
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryChatLogRepository {
    rows: Mutex<Vec<ChatRecord>>,
    next_id: AtomicI64,
}

impl InMemoryChatLogRepository {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl ChatLogRepositoryTrait for InMemoryChatLogRepository {
    async fn append(
        &self,
        username: &str,
        query: &str,
        response: &str,
        log_id: Option<i64>,
    ) -> Result<i64, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().unwrap().push(ChatRecord {
            id,
            username: username.to_string(),
            query: query.to_string(),
            response: response.to_string(),
            log_id,
            feedback: None,
            preferred_response: None,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn load(&self, username: &str) -> Result<Vec<ChatRecord>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.username == username)
            .cloned()
            .collect())
    }

    async fn clear(&self, username: &str) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.username != username);
        Ok((before - rows.len()) as u64)
    }

    async fn record_feedback(
        &self,
        log_id: i64,
        verdict: &str,
        comment: Option<&str>,
    ) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let mut updated = false;
        for record in rows.iter_mut().filter(|r| r.log_id == Some(log_id)) {
            record.feedback = Some(verdict.to_string());
            record.preferred_response = comment.map(str::to_string);
            updated = true;
        }
        Ok(updated)
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    rows: Mutex<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, password: &str) {
        let hash = pulsy_backend::utils::password::hash_password(password).expect("hash");
        self.rows.lock().unwrap().insert(
            username.to_string(),
            User {
                id: format!("user-{}", username),
                username: username.to_string(),
                password_hash: hash,
                created_at: Utc::now(),
            },
        );
    }
}

#[async_trait]
impl UserRepositoryTrait for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.rows.lock().unwrap().get(username).cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<User>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(username) {
            return Ok(None);
        }
        let user = User {
            id: format!("user-{}", username),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        rows.insert(username.to_string(), user.clone());
        Ok(Some(user))
    }
}

/// Everything needed to assemble an `AppState` over in-memory storage, with
/// handles kept so tests can inspect what the services persisted.
pub struct TestHarness {
    pub config: Config,
    pub users: Arc<InMemoryUserRepository>,
    pub states: Arc<InMemoryOauthStateRepository>,
    pub devices: Arc<InMemoryDeviceRepository>,
    pub chat_logs: Arc<InMemoryChatLogRepository>,
    pub bridge: Arc<SessionBridge>,
    pub device_tokens: Arc<DeviceTokenService>,
    pub chat_history: Arc<ChatHistoryService>,
    pub agent: Arc<AgentClient>,
}

impl TestHarness {
    pub fn new(config: Config) -> Self {
        let http = reqwest::Client::new();
        let users = Arc::new(InMemoryUserRepository::new());
        let states = Arc::new(InMemoryOauthStateRepository::new());
        let devices = Arc::new(InMemoryDeviceRepository::new());
        let chat_logs = Arc::new(InMemoryChatLogRepository::new());

        let bridge = Arc::new(SessionBridge::new(states.clone(), config.clone()));
        let device_tokens = Arc::new(DeviceTokenService::new(
            http.clone(),
            config.clone(),
            devices.clone(),
            bridge.clone(),
            DeviceLockRegistry::new(),
        ));
        let chat_history = Arc::new(ChatHistoryService::new(chat_logs.clone()));
        let agent = Arc::new(AgentClient::new(http, config.agent_base_url.clone()));

        Self {
            config,
            users,
            states,
            devices,
            chat_logs,
            bridge,
            device_tokens,
            chat_history,
            agent,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.config.clone(),
            self.users.clone(),
            self.bridge.clone(),
            self.device_tokens.clone(),
            self.chat_history.clone(),
            self.agent.clone(),
        )
    }

    pub fn router(&self) -> axum::Router {
        pulsy_backend::build_router(self.app_state())
    }
}

/// Binds an ephemeral local listener serving `router` and returns its base
/// URL. The server task runs until the test binary exits.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{}", addr)
}
