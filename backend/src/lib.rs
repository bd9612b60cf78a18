pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod utils;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Assembles the full route tree. Split out of `main` so integration tests
/// can mount it over in-memory repositories.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/link/callback", get(handlers::devices::link_callback))
        .route("/api/docs/openapi.json", get(docs::openapi_json));

    let session_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/devices", get(handlers::devices::list_devices))
        .route("/api/devices/action", post(handlers::devices::device_action))
        .route("/api/chat/stream", get(handlers::chat::stream))
        .route("/api/chat/save-history", post(handlers::chat::save_history))
        .route("/api/chat/feedback", post(handlers::chat::feedback))
        .route(
            "/api/chat/history",
            get(handlers::chat::get_history).delete(handlers::chat::clear_history),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::session_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .with_state(state)
}
