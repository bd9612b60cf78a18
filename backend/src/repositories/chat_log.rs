//! Append-only chat ledger.

use async_trait::async_trait;

use crate::db::connection::DbPool;
use crate::error::AppError;
use crate::models::chat::ChatRecord;

#[async_trait]
pub trait ChatLogRepositoryTrait: Send + Sync {
    /// Durable insert; not idempotent — callers must not double-invoke for
    /// the same turn.
    async fn append(
        &self,
        username: &str,
        query: &str,
        response: &str,
        log_id: Option<i64>,
    ) -> Result<i64, AppError>;

    /// All records for `username`, in insertion order.
    async fn load(&self, username: &str) -> Result<Vec<ChatRecord>, AppError>;

    async fn clear(&self, username: &str) -> Result<u64, AppError>;

    /// Records feedback against the turn with the given backend log id.
    /// Returns `false` if no such record exists.
    async fn record_feedback(
        &self,
        log_id: i64,
        verdict: &str,
        comment: Option<&str>,
    ) -> Result<bool, AppError>;
}

pub struct PgChatLogRepository {
    pool: DbPool,
}

impl PgChatLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatLogRepositoryTrait for PgChatLogRepository {
    async fn append(
        &self,
        username: &str,
        query: &str,
        response: &str,
        log_id: Option<i64>,
    ) -> Result<i64, AppError> {
        let record_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO chat_logs (username, query, response, log_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(query)
        .bind(response)
        .bind(log_id)
        .fetch_one(&*self.pool)
        .await?;

        Ok(record_id)
    }

    async fn load(&self, username: &str) -> Result<Vec<ChatRecord>, AppError> {
        let records = sqlx::query_as::<_, ChatRecord>(
            r#"
            SELECT id, username, query, response, log_id, feedback, preferred_response, created_at
            FROM chat_logs
            WHERE username = $1
            ORDER BY id
            "#,
        )
        .bind(username)
        .fetch_all(&*self.pool)
        .await?;

        Ok(records)
    }

    async fn clear(&self, username: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM chat_logs
            WHERE username = $1
            "#,
        )
        .bind(username)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn record_feedback(
        &self,
        log_id: i64,
        verdict: &str,
        comment: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE chat_logs
            SET feedback = $2, preferred_response = $3
            WHERE log_id = $1
            "#,
        )
        .bind(log_id)
        .bind(verdict)
        .bind(comment)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
