#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use axum::Json;
use utoipa::OpenApi;

use crate::handlers::devices::DeviceActionResponse;
use crate::models::{
    chat::{FeedbackRequest, SaveHistoryRequest, SaveHistoryResponse, StreamQuery},
    device::{DeviceAction, DeviceActionKind, DeviceType},
    session::{ChatCache, DeviceStatus, Session},
    user::{LoginRequest, LoginResponse, RegisterRequest},
};
use crate::services::agent::AgentEvent;

#[derive(OpenApi)]
#[openapi(
    paths(
        login_doc,
        register_doc,
        logout_doc,
        device_action_doc,
        list_devices_doc,
        link_callback_doc,
        chat_stream_doc,
        save_history_doc,
        feedback_doc,
        get_history_doc,
        clear_history_doc
    ),
    components(
        schemas(
            // auth
            LoginRequest,
            RegisterRequest,
            LoginResponse,
            Session,
            ChatCache,
            // devices
            DeviceAction,
            DeviceActionKind,
            DeviceActionResponse,
            DeviceType,
            DeviceStatus,
            // chat
            StreamQuery,
            AgentEvent,
            SaveHistoryRequest,
            SaveHistoryResponse,
            FeedbackRequest
        )
    ),
    tags(
        (name = "Auth", description = "Login, registration, and session cookies"),
        (name = "Devices", description = "Wearable linking, unlinking, and connectivity"),
        (name = "Chat", description = "Streaming queries and durable chat history")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
fn login_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = LoginResponse),
        (status = 400, description = "Username taken or validation failed")
    ),
    tag = "Auth"
)]
fn register_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Session cookie cleared")),
    tag = "Auth"
)]
fn logout_doc() {}

#[utoipa::path(
    post,
    path = "/api/devices/action",
    request_body = DeviceAction,
    responses(
        (status = 200, description = "Linked, deleted, or provider redirect URL", body = DeviceActionResponse),
        (status = 400, description = "Unsupported device or bad payload"),
        (status = 401, description = "Device key failed the connectivity probe")
    ),
    tag = "Devices"
)]
fn device_action_doc() {}

#[utoipa::path(
    get,
    path = "/api/devices",
    responses((status = 200, description = "Live connectivity per linked device", body = [DeviceStatus])),
    tag = "Devices"
)]
fn list_devices_doc() {}

#[utoipa::path(
    get,
    path = "/api/link/callback",
    params(
        ("code" = String, Query, description = "Authorization code from the provider"),
        ("state" = String, Query, description = "Single-use correlation token")
    ),
    responses(
        (status = 303, description = "Session restored and device linked; redirects home. Unknown or consumed state redirects to login.")
    ),
    tag = "Devices"
)]
fn link_callback_doc() {}

#[utoipa::path(
    get,
    path = "/api/chat/stream",
    params(("query" = String, Query, description = "User's chat query")),
    responses(
        (status = 200, description = "Newline-delimited JSON event stream ending in a final or error event", body = AgentEvent)
    ),
    tag = "Chat"
)]
fn chat_stream_doc() {}

#[utoipa::path(
    post,
    path = "/api/chat/save-history",
    request_body = SaveHistoryRequest,
    responses((status = 200, description = "Turn persisted", body = SaveHistoryResponse)),
    tag = "Chat"
)]
fn save_history_doc() {}

#[utoipa::path(
    post,
    path = "/api/chat/feedback",
    request_body = FeedbackRequest,
    responses(
        (status = 204, description = "Feedback recorded against the latest turn"),
        (status = 400, description = "No completed turn in the session"),
        (status = 404, description = "No ledger record for the turn's log id")
    ),
    tag = "Chat"
)]
fn feedback_doc() {}

#[utoipa::path(
    get,
    path = "/api/chat/history",
    responses((status = 200, description = "All ledger records for the user")),
    tag = "Chat"
)]
fn get_history_doc() {}

#[utoipa::path(
    delete,
    path = "/api/chat/history",
    responses((status = 204, description = "History deleted and session cache reset")),
    tag = "Chat"
)]
fn clear_history_doc() {}
