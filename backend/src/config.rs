use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub session_secret: String,
    pub session_expiration_hours: u64,
    /// Correlation tokens older than this are fair game for the sweep.
    pub oauth_state_ttl_minutes: i64,
    pub agent_base_url: String,
    pub oura_client_id: String,
    pub oura_client_secret: String,
    pub oura_redirect_uri: String,
    pub oura_auth_url: String,
    pub oura_token_url: String,
    pub oura_probe_url: String,
    /// Upper bound on any single provider call (probe or token exchange).
    pub provider_timeout_secs: u64,
    pub cookie_secure: bool,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/pulsy".to_string());

        let session_secret = env::var("SESSION_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let session_expiration_hours = env::var("SESSION_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "12".to_string())
            .parse()
            .unwrap_or(12);

        let oauth_state_ttl_minutes = env::var("OAUTH_STATE_TTL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);

        let agent_base_url =
            env::var("AGENT_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

        let oura_client_id = env::var("OURA_CLIENT_ID").unwrap_or_default();
        let oura_client_secret = env::var("OURA_CLIENT_SECRET").unwrap_or_default();
        let oura_redirect_uri = env::var("OURA_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:3000/api/link/callback".to_string());
        let oura_auth_url = env::var("OURA_AUTH_URL")
            .unwrap_or_else(|_| "https://cloud.ouraring.com/oauth/authorize".to_string());
        let oura_token_url = env::var("OURA_TOKEN_URL")
            .unwrap_or_else(|_| "https://api.ouraring.com/oauth/token".to_string());
        let oura_probe_url = env::var("OURA_PROBE_URL").unwrap_or_else(|_| {
            "https://api.ouraring.com/v2/usercollection/personal_info".to_string()
        });

        let provider_timeout_secs = env::var("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Config {
            database_url,
            session_secret,
            session_expiration_hours,
            oauth_state_ttl_minutes,
            agent_base_url,
            oura_client_id,
            oura_client_secret,
            oura_redirect_uri,
            oura_auth_url,
            oura_token_url,
            oura_probe_url,
            provider_timeout_secs,
            cookie_secure,
        })
    }
}
