//! Streaming client for the reasoning backend.
//!
//! The backend emits newline-delimited JSON event frames over a long-lived
//! response body. The transport may chunk those bytes anywhere, so frames go
//! through a buffer-and-split decoder that only yields an event once a
//! complete delimiter has been seen; a trailing partial frame is carried
//! forward and never decoded.

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// One decoded frame from the reasoning backend.
///
/// A stream is a finite, ordered, non-restartable sequence of these, always
/// ending in exactly one `Final` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Partial answer fragment.
    Token { text: String },
    /// Tool invocation progress.
    ToolCall { name: String, status: String },
    /// Complete answer plus the backend's log identifier.
    Final { response: String, log_id: i64 },
    /// Terminal failure, delivered in-band because response headers are
    /// already committed by the time it can occur.
    Error { message: String },
}

impl AgentEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Final { .. } | AgentEvent::Error { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed event frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Buffer-and-split decoder over newline-delimited JSON frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next fully-delimited frame, if any. Partial data stays buffered.
    pub fn next_event(&mut self) -> Option<Result<AgentEvent, FrameError>> {
        loop {
            let pos = self.buf.iter().position(|&b| b == b'\n')?;
            let line = self.buf.split_to(pos + 1);
            let mut frame = &line[..line.len() - 1];
            if frame.ends_with(b"\r") {
                frame = &frame[..frame.len() - 1];
            }
            if frame.is_empty() {
                continue;
            }
            return Some(serde_json::from_slice(frame).map_err(FrameError::from));
        }
    }

    /// Bytes still buffered without a closing delimiter.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Query payload sent to the reasoning backend.
#[derive(Debug, Clone, Serialize)]
pub struct AgentQuery {
    pub query: String,
    pub username: String,
    pub user_history: Vec<String>,
    pub ai_chat_history: Vec<String>,
}

struct DecodeState<S> {
    upstream: S,
    decoder: FrameDecoder,
    done: bool,
}

/// Decodes a chunked byte stream into an ordered event sequence that is
/// guaranteed to end in exactly one terminal event. Transport failures and
/// premature ends are converted to a terminal `Error` in-band.
pub fn decode_event_stream<S, E>(upstream: S) -> impl Stream<Item = AgentEvent> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = DecodeState {
        upstream: Box::pin(upstream),
        decoder: FrameDecoder::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            if let Some(decoded) = state.decoder.next_event() {
                match decoded {
                    Ok(event) => {
                        if event.is_terminal() {
                            state.done = true;
                        }
                        return Some((event, state));
                    }
                    Err(err) => {
                        state.done = true;
                        return Some((
                            AgentEvent::Error {
                                message: err.to_string(),
                            },
                            state,
                        ));
                    }
                }
            }
            match state.upstream.next().await {
                Some(Ok(chunk)) => state.decoder.feed(&chunk),
                Some(Err(err)) => {
                    state.done = true;
                    return Some((
                        AgentEvent::Error {
                            message: format!("upstream stream failed: {}", err),
                        },
                        state,
                    ));
                }
                None => {
                    state.done = true;
                    return Some((
                        AgentEvent::Error {
                            message: "stream ended before a terminal event".to_string(),
                        },
                        state,
                    ));
                }
            }
        }
    })
}

/// HTTP client for the reasoning backend.
pub struct AgentClient {
    http: reqwest::Client,
    base_url: String,
}

impl AgentClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Opens one long-lived connection to the backend and returns the decoded
    /// event sequence. Dropping the returned stream aborts the upstream
    /// connection; nothing is persisted here.
    pub async fn open_stream(
        &self,
        query: &AgentQuery,
    ) -> Result<BoxStream<'static, AgentEvent>, AppError> {
        let url = format!("{}/query_stream", self.base_url.trim_end_matches('/'));
        let response = self.http.post(&url).json(query).send().await.map_err(|e| {
            AppError::InternalServerError(anyhow::anyhow!("Failed to reach agent backend: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Provider {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(decode_event_stream(response.bytes_stream()).boxed())
    }
}
