use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Method;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulsy_backend::config::Config;
use pulsy_backend::db::connection::{create_pool, DbPool};
use pulsy_backend::repositories::{
    PgChatLogRepository, PgDeviceRepository, PgOauthStateRepository, PgUserRepository,
};
use pulsy_backend::services::{
    AgentClient, ChatHistoryService, DeviceLockRegistry, DeviceTokenService, SessionBridge,
};
use pulsy_backend::state::AppState;

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulsy_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        session_secret = %mask_secret(&config.session_secret),
        session_expiration_hours = config.session_expiration_hours,
        oauth_state_ttl_minutes = config.oauth_state_ttl_minutes,
        agent_base_url = %config.agent_base_url,
        oura_client_id = %mask_secret(&config.oura_client_id),
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool: DbPool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&*pool).await?;

    // Wire repositories and services; everything is assembled once here and
    // shared behind Arcs.
    // Connection establishment is bounded here; total-duration timeouts are
    // per request, since the agent stream stays open indefinitely.
    let http = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()?;
    let users = Arc::new(PgUserRepository::new(pool.clone()));
    let states = Arc::new(PgOauthStateRepository::new(pool.clone()));
    let devices = Arc::new(PgDeviceRepository::new(pool.clone()));
    let chat_logs = Arc::new(PgChatLogRepository::new(pool.clone()));

    let bridge = Arc::new(SessionBridge::new(states, config.clone()));
    let device_tokens = Arc::new(DeviceTokenService::new(
        http.clone(),
        config.clone(),
        devices,
        bridge.clone(),
        DeviceLockRegistry::new(),
    ));
    let chat_history = Arc::new(ChatHistoryService::new(chat_logs));
    let agent = Arc::new(AgentClient::new(http, config.agent_base_url.clone()));

    let state = AppState::new(
        config,
        users,
        bridge,
        device_tokens,
        chat_history,
        agent,
    );

    let app = pulsy_backend::build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([
                        Method::GET,
                        Method::POST,
                        Method::PUT,
                        Method::DELETE,
                        Method::OPTIONS,
                    ])
                    .allow_headers(Any)
                    .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
            ),
    );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
