//! SQLite refresh-credential repository.
//!
//! Implements `CredentialStore` from `planeja-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, reads on the reader
//! pool, mutations on the writer pool.

use chrono::Utc;
use planeja_core::auth::store::CredentialStore;
use planeja_types::credential::{BackendKind, CleanupReport, RefreshCredential};
use planeja_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{classify_error, format_datetime, parse_datetime};

pub struct SqliteCredentialStore {
    pool: DatabasePool,
}

impl SqliteCredentialStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain RefreshCredential.
struct CredentialRow {
    id: String,
    subject_id: String,
    secret: String,
    issued_at: String,
    expires_at: String,
    source_ip: Option<String>,
    user_agent: Option<String>,
}

impl CredentialRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            subject_id: row.try_get("subject_id")?,
            secret: row.try_get("secret")?,
            issued_at: row.try_get("issued_at")?,
            expires_at: row.try_get("expires_at")?,
            source_ip: row.try_get("source_ip")?,
            user_agent: row.try_get("user_agent")?,
        })
    }

    fn into_credential(self) -> Result<RefreshCredential, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid credential id: {e}")))?;
        let subject_id = Uuid::parse_str(&self.subject_id)
            .map_err(|e| RepositoryError::Query(format!("invalid subject_id: {e}")))?;

        Ok(RefreshCredential {
            id,
            subject_id,
            secret: self.secret,
            issued_at: parse_datetime(&self.issued_at)?,
            expires_at: parse_datetime(&self.expires_at)?,
            source_ip: self.source_ip,
            user_agent: self.user_agent,
        })
    }
}

fn map_rows(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<RefreshCredential>, RepositoryError> {
    let mut credentials = Vec::with_capacity(rows.len());
    for row in rows {
        let credential_row = CredentialRow::from_row(row).map_err(classify_error)?;
        credentials.push(credential_row.into_credential()?);
    }
    Ok(credentials)
}

impl CredentialStore for SqliteCredentialStore {
    async fn save(
        &self,
        credential: &RefreshCredential,
    ) -> Result<RefreshCredential, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO auth_refresh_tokens (id, subject_id, secret, issued_at, expires_at, source_ip, user_agent)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(credential.id.to_string())
        .bind(credential.subject_id.to_string())
        .bind(&credential.secret)
        .bind(format_datetime(&credential.issued_at))
        .bind(format_datetime(&credential.expires_at))
        .bind(&credential.source_ip)
        .bind(&credential.user_agent)
        .execute(&self.pool.writer)
        .await
        .map_err(classify_error)?;

        Ok(credential.clone())
    }

    async fn find_by_secret(
        &self,
        secret: &str,
    ) -> Result<Option<RefreshCredential>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM auth_refresh_tokens WHERE secret = ?")
            .bind(secret)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(classify_error)?;

        match row {
            Some(row) => {
                let credential_row = CredentialRow::from_row(&row).map_err(classify_error)?;
                Ok(Some(credential_row.into_credential()?))
            }
            None => Ok(None),
        }
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<RefreshCredential>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM auth_refresh_tokens WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(classify_error)?;

        match row {
            Some(row) => {
                let credential_row = CredentialRow::from_row(&row).map_err(classify_error)?;
                Ok(Some(credential_row.into_credential()?))
            }
            None => Ok(None),
        }
    }

    async fn delete_by_id(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM auth_refresh_tokens WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(classify_error)?;

        // The single-connection writer pool serializes deletes, so exactly
        // one concurrent rotation observes the removed row.
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_secret(&self, secret: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM auth_refresh_tokens WHERE secret = ?")
            .bind(secret)
            .execute(&self.pool.writer)
            .await
            .map_err(classify_error)?;

        Ok(())
    }

    async fn list_by_subject(
        &self,
        subject_id: &Uuid,
    ) -> Result<Vec<RefreshCredential>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM auth_refresh_tokens WHERE subject_id = ? ORDER BY issued_at DESC",
        )
        .bind(subject_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(classify_error)?;

        map_rows(&rows)
    }

    async fn cleanup_expired(&self) -> Result<CleanupReport, RepositoryError> {
        let result = sqlx::query("DELETE FROM auth_refresh_tokens WHERE expires_at <= ?")
            .bind(format_datetime(&Utc::now()))
            .execute(&self.pool.writer)
            .await
            .map_err(classify_error)?;

        Ok(CleanupReport {
            removed: result.rows_affected(),
            backend: BackendKind::Durable,
        })
    }

    async fn probe(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(classify_error)?;
        Ok(())
    }
}
