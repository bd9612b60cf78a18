//! Login, registration, and logout.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use validator::Validate;

use crate::error::AppError;
use crate::models::session::Session;
use crate::models::user::{LoginRequest, LoginResponse, RegisterRequest};
use crate::state::AppState;
use crate::utils::password::{hash_password, verify_password};

use super::{clear_session_headers, session_headers};

/// Verifies credentials and issues a fresh session cookie. The session is
/// primed with live device connectivity and the user's durable chat history
/// so the first chat request needs no extra reads.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<LoginResponse>), AppError> {
    payload.validate()?;

    let user = state
        .users
        .find_by_username(&payload.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let mut session = Session::new(&user.username);

    let document = state.device_tokens.load_document(&user.username).await?;
    session.device_statuses = state.device_tokens.probe_statuses(&document).await;
    session.chat_cache = state.chat_history.load_cache(&user.username).await?;

    tracing::info!(username = %user.username, "user logged in");

    let headers = session_headers(&state, &session)?;
    Ok((
        headers,
        Json(LoginResponse {
            username: session.username,
            device_statuses: session.device_statuses,
        }),
    ))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    payload.validate()?;

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create_user(&payload.username, &password_hash)
        .await?
        .ok_or_else(|| AppError::BadRequest("Username is already taken".to_string()))?;

    tracing::info!(username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            username: user.username,
            device_statuses: Vec::new(),
        }),
    ))
}

pub async fn logout(State(state): State<AppState>) -> Result<(HeaderMap, StatusCode), AppError> {
    let headers = clear_session_headers(&state)?;
    Ok((headers, StatusCode::NO_CONTENT))
}
