//! Durable chat history on top of the append-only ledger.

use std::sync::Arc;

use crate::error::AppError;
use crate::models::chat::ChatRecord;
use crate::models::session::ChatCache;
use crate::repositories::ChatLogRepositoryTrait;

pub struct ChatHistoryService {
    logs: Arc<dyn ChatLogRepositoryTrait>,
}

impl ChatHistoryService {
    pub fn new(logs: Arc<dyn ChatLogRepositoryTrait>) -> Self {
        Self { logs }
    }

    /// Appends one completed turn and returns the ledger row id.
    pub async fn append(
        &self,
        username: &str,
        query: &str,
        response: &str,
        log_id: Option<i64>,
    ) -> Result<i64, AppError> {
        let record_id = self.logs.append(username, query, response, log_id).await?;
        tracing::debug!(username, record_id, "appended chat turn");
        Ok(record_id)
    }

    pub async fn records(&self, username: &str) -> Result<Vec<ChatRecord>, AppError> {
        self.logs.load(username).await
    }

    /// Folds the user's ledger into the paired query/response cache the
    /// reasoning backend consumes as context.
    pub async fn load_cache(&self, username: &str) -> Result<ChatCache, AppError> {
        let records = self.logs.load(username).await?;
        let mut cache = ChatCache::default();
        for record in records {
            cache.queries.push(record.query);
            cache.responses.push(record.response);
        }
        Ok(cache)
    }

    pub async fn clear(&self, username: &str) -> Result<u64, AppError> {
        let deleted = self.logs.clear(username).await?;
        tracing::info!(username, deleted, "cleared chat history");
        Ok(deleted)
    }

    /// Attaches a feedback verdict to the turn identified by the backend's
    /// log id. `NotFound` when no ledger row carries that id.
    pub async fn record_feedback(
        &self,
        log_id: i64,
        verdict: &str,
        comment: Option<&str>,
    ) -> Result<(), AppError> {
        if self.logs.record_feedback(log_id, verdict, comment).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!(
                "No chat record with log id {}",
                log_id
            )))
        }
    }
}
