pub mod auth;
pub mod chat;
pub mod devices;

use std::time::Duration;

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};

use crate::error::AppError;
use crate::models::session::Session;
use crate::state::AppState;
use crate::utils::cookies::{
    build_clear_cookie, build_session_cookie, CookieOptions, SameSite, SESSION_COOKIE_NAME,
    SESSION_COOKIE_PATH,
};
use crate::utils::session_token::encode_session;

fn cookie_options(state: &AppState) -> CookieOptions {
    CookieOptions {
        secure: state.config.cookie_secure,
        same_site: SameSite::Lax,
    }
}

/// Signs `session` and returns headers flushing it to the client. Every
/// handler that mutates the session must attach these before the body; the
/// streaming endpoint deliberately never does.
pub(crate) fn session_headers(state: &AppState, session: &Session) -> Result<HeaderMap, AppError> {
    let token = encode_session(
        session,
        &state.config.session_secret,
        state.config.session_expiration_hours,
    )?;
    let cookie = build_session_cookie(
        SESSION_COOKIE_NAME,
        &token,
        Duration::from_secs(state.config.session_expiration_hours * 3600),
        SESSION_COOKIE_PATH,
        cookie_options(state),
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e)))?,
    );
    Ok(headers)
}

pub(crate) fn clear_session_headers(state: &AppState) -> Result<HeaderMap, AppError> {
    let cookie = build_clear_cookie(SESSION_COOKIE_NAME, SESSION_COOKIE_PATH, cookie_options(state));
    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e)))?,
    );
    Ok(headers)
}
