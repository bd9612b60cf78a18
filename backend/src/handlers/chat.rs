//! Chat streaming and the durable history endpoints.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Extension, Json,
};
use bytes::Bytes;
use futures::StreamExt;
use validator::Validate;

use crate::error::AppError;
use crate::models::chat::{
    ChatRecord, FeedbackRequest, SaveHistoryRequest, SaveHistoryResponse, StreamQuery,
};
use crate::models::session::Session;
use crate::services::AgentQuery;
use crate::state::AppState;

use super::session_headers;

/// Proxies one query to the reasoning backend as a newline-delimited JSON
/// event stream.
///
/// Headers are committed before the first upstream frame arrives, so this
/// handler writes nothing to the session: the client persists the completed
/// turn via `save_history` afterwards. Any upstream failure past this point
/// arrives as an in-band terminal `error` event.
pub async fn stream(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<StreamQuery>,
) -> Result<Response, AppError> {
    if params.query.trim().is_empty() {
        return Err(AppError::BadRequest("Query must not be empty".to_string()));
    }

    let query = AgentQuery {
        query: params.query,
        username: session.username.clone(),
        user_history: session.chat_cache.queries.clone(),
        ai_chat_history: session.chat_cache.responses.clone(),
    };

    let events = state.agent.open_stream(&query).await?;
    let body = events.map(|event| {
        let mut line = serde_json::to_string(&event).unwrap_or_else(|_| {
            "{\"type\":\"error\",\"message\":\"failed to encode event\"}".to_string()
        });
        line.push('\n');
        Ok::<_, Infallible>(Bytes::from(line))
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", "no")
        .body(Body::from_stream(body))
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e)))?;
    Ok(response)
}

/// Persists a completed turn into the ledger and folds it into the session's
/// chat cache. Not idempotent; the client calls this exactly once per
/// completed stream.
pub async fn save_history(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
    Json(payload): Json<SaveHistoryRequest>,
) -> Result<(HeaderMap, Json<SaveHistoryResponse>), AppError> {
    payload.validate()?;

    let record_id = state
        .chat_history
        .append(
            &session.username,
            &payload.query,
            &payload.response,
            payload.log_id,
        )
        .await?;

    session.push_turn(payload.query, payload.response, payload.log_id);
    let headers = session_headers(&state, &session)?;

    Ok((headers, Json(SaveHistoryResponse { record_id })))
}

/// Attaches a verdict to the most recent completed turn.
pub async fn feedback(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;

    let log_id = session.last_log_id.ok_or_else(|| {
        AppError::BadRequest("No completed turn to attach feedback to".to_string())
    })?;

    state
        .chat_history
        .record_feedback(log_id, &payload.feedback, payload.comment.as_deref())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_history(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<ChatRecord>>, AppError> {
    Ok(Json(state.chat_history.records(&session.username).await?))
}

/// Deletes the user's durable history and resets the session's cache.
pub async fn clear_history(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
) -> Result<(HeaderMap, StatusCode), AppError> {
    state.chat_history.clear(&session.username).await?;

    session.chat_cache = Default::default();
    session.last_log_id = None;
    let headers = session_headers(&state, &session)?;

    Ok((headers, StatusCode::NO_CONTENT))
}
