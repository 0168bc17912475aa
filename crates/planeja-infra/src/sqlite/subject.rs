//! SQLite subject repository.

use planeja_core::auth::store::SubjectStore;
use planeja_types::error::RepositoryError;
use planeja_types::identity::{NewSubject, SubjectRecord};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{classify_error, format_datetime, parse_datetime};

pub struct SqliteSubjectStore {
    pool: DatabasePool,
}

impl SqliteSubjectStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct SubjectRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    created_at: String,
}

impl SubjectRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_record(self) -> Result<SubjectRecord, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid subject id: {e}")))?;

        Ok(SubjectRecord {
            id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl SubjectStore for SqliteSubjectStore {
    async fn create(&self, subject: &NewSubject) -> Result<SubjectRecord, RepositoryError> {
        let record = SubjectRecord {
            id: Uuid::now_v7(),
            name: subject.name.clone(),
            email: subject.email.clone(),
            password_hash: subject.password_hash.clone(),
            created_at: chrono::Utc::now(),
        };

        sqlx::query(
            r#"INSERT INTO subjects (id, name, email, password_hash, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(format_datetime(&record.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(classify_error)?;

        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<SubjectRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM subjects WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(classify_error)?;

        match row {
            Some(row) => {
                let subject_row = SubjectRow::from_row(&row).map_err(classify_error)?;
                Ok(Some(subject_row.into_record()?))
            }
            None => Ok(None),
        }
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<SubjectRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM subjects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(classify_error)?;

        match row {
            Some(row) => {
                let subject_row = SubjectRow::from_row(&row).map_err(classify_error)?;
                Ok(Some(subject_row.into_record()?))
            }
            None => Ok(None),
        }
    }
}
