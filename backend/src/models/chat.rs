//! Chat ledger records and the HTTP payloads around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Append-only row in the chat ledger. Only the feedback columns are
/// mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatRecord {
    pub id: i64,
    pub username: String,
    pub query: String,
    pub response: String,
    /// Identifier assigned by the reasoning backend's own logger, when the
    /// turn came from a completed stream.
    pub log_id: Option<i64>,
    pub feedback: Option<String>,
    pub preferred_response: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload of `POST /api/chat/save-history`, sent by the client after the
/// stream has concluded.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SaveHistoryRequest {
    #[validate(length(min = 1))]
    pub query: String,
    #[validate(length(min = 1))]
    pub response: String,
    pub log_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveHistoryResponse {
    pub record_id: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FeedbackRequest {
    /// Verdict on the most recent turn, e.g. "up" or "down".
    #[validate(length(min = 1))]
    pub feedback: String,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StreamQuery {
    pub query: String,
}
