//! Correlation-token storage for the session bridge.
//!
//! One row per in-flight external authorization. Tokens are stored hashed;
//! consumption is a single `DELETE ... RETURNING`, so a token can never be
//! redeemed twice even under concurrent callbacks.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::db::connection::DbPool;
use crate::error::AppError;

#[async_trait]
pub trait OauthStateRepositoryTrait: Send + Sync {
    /// Stores `snapshot` keyed by `token`. One durable row per call.
    async fn insert_state(&self, token: &str, snapshot: Value) -> Result<(), AppError>;

    /// Atomically looks up and deletes the row for `token`. `None` means the
    /// token is unknown, expired, or already consumed.
    async fn consume_state(&self, token: &str) -> Result<Option<Value>, AppError>;

    /// Expiry sweep; returns the number of rows removed.
    async fn delete_expired(&self, ttl: Duration) -> Result<u64, AppError>;
}

pub struct PgOauthStateRepository {
    pool: DbPool,
}

impl PgOauthStateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OauthStateRepositoryTrait for PgOauthStateRepository {
    async fn insert_state(&self, token: &str, snapshot: Value) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO oauth_states (state_hash, session_snapshot, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(hash_state_token(token))
        .bind(snapshot)
        .bind(Utc::now())
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    async fn consume_state(&self, token: &str) -> Result<Option<Value>, AppError> {
        let snapshot = sqlx::query_scalar::<_, Value>(
            r#"
            DELETE FROM oauth_states
            WHERE state_hash = $1
            RETURNING session_snapshot
            "#,
        )
        .bind(hash_state_token(token))
        .fetch_optional(&*self.pool)
        .await?;

        Ok(snapshot)
    }

    async fn delete_expired(&self, ttl: Duration) -> Result<u64, AppError> {
        let cutoff = Utc::now() - ttl;

        let result = sqlx::query(
            r#"
            DELETE FROM oauth_states
            WHERE created_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn hash_state_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_state_token() {
        let token = "test-token-123";
        let hash1 = hash_state_token(token);
        let hash2 = hash_state_token(token);
        assert_eq!(hash1, hash2);
        assert_ne!(hash_state_token("different-token"), hash1);
    }
}
