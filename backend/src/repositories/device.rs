//! Versioned storage of the per-user device document.
//!
//! Writes are conditional on the version read beforehand; a `false` return
//! from `store_document` means another writer got there first and the caller
//! must re-read before retrying. This, together with the per-user lock in the
//! token manager, makes device mutations linearizable.

use async_trait::async_trait;
use sqlx::types::Json;

use crate::db::connection::DbPool;
use crate::error::AppError;
use crate::models::device::DeviceDocument;

#[derive(Debug, Clone, Default)]
pub struct VersionedDocument {
    pub document: DeviceDocument,
    /// 0 means no row exists yet for this user.
    pub version: i64,
}

#[async_trait]
pub trait DeviceRepositoryTrait: Send + Sync {
    async fn load_document(&self, username: &str) -> Result<VersionedDocument, AppError>;

    /// Persists `document` only if the stored version still equals
    /// `expected_version`. Returns `false` on a version miss.
    async fn store_document(
        &self,
        username: &str,
        document: &DeviceDocument,
        expected_version: i64,
    ) -> Result<bool, AppError>;
}

pub struct PgDeviceRepository {
    pool: DbPool,
}

impl PgDeviceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRepositoryTrait for PgDeviceRepository {
    async fn load_document(&self, username: &str) -> Result<VersionedDocument, AppError> {
        let row = sqlx::query_as::<_, (Json<DeviceDocument>, i64)>(
            r#"
            SELECT devices, version
            FROM user_devices
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(match row {
            Some((Json(document), version)) => VersionedDocument { document, version },
            None => VersionedDocument::default(),
        })
    }

    async fn store_document(
        &self,
        username: &str,
        document: &DeviceDocument,
        expected_version: i64,
    ) -> Result<bool, AppError> {
        let result = if expected_version == 0 {
            sqlx::query(
                r#"
                INSERT INTO user_devices (username, devices, version)
                VALUES ($1, $2, 1)
                ON CONFLICT (username) DO NOTHING
                "#,
            )
            .bind(username)
            .bind(Json(document))
            .execute(&*self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE user_devices
                SET devices = $2, version = version + 1, updated_at = now()
                WHERE username = $1 AND version = $3
                "#,
            )
            .bind(username)
            .bind(Json(document))
            .bind(expected_version)
            .execute(&*self.pool)
            .await?
        };

        Ok(result.rows_affected() == 1)
    }
}
