//! Device linking, unlinking, and the OAuth callback.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;
use crate::models::device::{DeviceAction, DeviceActionKind};
use crate::models::session::{DeviceStatus, Session};
use crate::services::AuthorizationStart;
use crate::state::AppState;

use super::session_headers;

#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceActionResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub device_statuses: Vec<DeviceStatus>,
}

/// Adds or removes a device binding.
///
/// Key-based adds link immediately; OAuth adds return the provider
/// authorization URL for the client to navigate to, and the session cookie is
/// left untouched because continuity is carried server-side across the hop.
pub async fn device_action(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
    Json(payload): Json<DeviceAction>,
) -> Result<(HeaderMap, Json<DeviceActionResponse>), AppError> {
    payload.validate()?;

    match payload.action {
        DeviceActionKind::Add => {
            let start = state
                .device_tokens
                .begin_authorization(&session, payload.device_type, payload.api_key.as_deref())
                .await?;

            match start {
                AuthorizationStart::Linked(_document) => {
                    session.set_device_status(payload.device_type, true);
                    let headers = session_headers(&state, &session)?;
                    Ok((
                        headers,
                        Json(DeviceActionResponse {
                            status: "linked",
                            redirect_url: None,
                            device_statuses: session.device_statuses,
                        }),
                    ))
                }
                AuthorizationStart::Redirect(url) => Ok((
                    HeaderMap::new(),
                    Json(DeviceActionResponse {
                        status: "redirect",
                        redirect_url: Some(url.to_string()),
                        device_statuses: session.device_statuses,
                    }),
                )),
            }
        }
        DeviceActionKind::Delete => {
            state
                .device_tokens
                .remove_binding(&session.username, payload.device_type)
                .await?;
            session.remove_device_status(payload.device_type);
            let headers = session_headers(&state, &session)?;
            Ok((
                headers,
                Json(DeviceActionResponse {
                    status: "deleted",
                    redirect_url: None,
                    device_statuses: session.device_statuses,
                }),
            ))
        }
    }
}

/// Current connectivity for every linked device, probed live.
pub async fn list_devices(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<DeviceStatus>>, AppError> {
    let document = state.device_tokens.load_document(&session.username).await?;
    Ok(Json(state.device_tokens.probe_statuses(&document).await))
}

#[derive(Debug, Deserialize)]
pub struct LinkCallbackQuery {
    pub code: String,
    pub state: String,
}

/// Landing point for the provider redirect. No session cookie is required
/// here: the `state` token alone restores the stashed session. Unknown or
/// replayed tokens bounce the browser back to login instead of surfacing an
/// error page.
pub async fn link_callback(
    State(state): State<AppState>,
    Query(params): Query<LinkCallbackQuery>,
) -> Result<(HeaderMap, Redirect), AppError> {
    match state
        .device_tokens
        .complete_link(&params.code, &params.state)
        .await
    {
        Ok((mut session, device_type)) => {
            session.set_device_status(device_type, true);
            let headers = session_headers(&state, &session)?;
            Ok((headers, Redirect::to("/")))
        }
        Err(AppError::StateNotFound) => {
            tracing::warn!("link callback with unknown or consumed state token");
            Ok((HeaderMap::new(), Redirect::to("/login")))
        }
        Err(err) => Err(err),
    }
}
