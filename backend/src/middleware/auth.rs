//! Session authentication middleware.

use axum::{
    extract::{Request, State},
    http::header::COOKIE,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::cookies::{extract_cookie_value, SESSION_COOKIE_NAME};
use crate::utils::session_token::decode_session;

/// Rehydrates the session from the signed cookie and makes it available to
/// handlers as an `Extension<Session>`. Requests without a valid,
/// authenticated session are rejected with 401.
pub async fn session_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| extract_cookie_value(h, SESSION_COOKIE_NAME))
        .ok_or_else(|| AppError::Unauthorized("Missing session cookie".to_string()))?;

    let session = decode_session(&token, &state.config.session_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired session".to_string()))?;

    if !session.authenticated {
        return Err(AppError::Unauthorized("Session not authenticated".to_string()));
    }

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
