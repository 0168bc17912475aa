//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools. `classify_error` decides which failures
//! count as infrastructure outages for the failover wrappers.

use chrono::{DateTime, Utc};
use planeja_types::error::RepositoryError;

pub mod chat;
pub mod credential;
pub mod pool;
pub mod subject;

/// Database error messages that indicate the backend itself is unusable
/// (missing schema, bad credentials, broken permissions) rather than a
/// problem with one query.
const UNAVAILABLE_NEEDLES: &[&str] = &[
    "no such table",
    "could not find the table",
    "schema cache",
    "invalid api key",
    "permission denied",
    "unable to open database",
    "attempt to write a readonly database",
];

/// Map a sqlx error into the repository taxonomy.
///
/// `Unavailable` is the class that trips the durable-to-memory failover;
/// everything data-shaped stays `Query`/`Conflict` so a bad statement never
/// silently abandons durability.
pub fn classify_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) => {
            if db.is_unique_violation() {
                return RepositoryError::Conflict(db.message().to_string());
            }
            let message = db.message().to_lowercase();
            if UNAVAILABLE_NEEDLES.iter().any(|n| message.contains(n)) {
                return RepositoryError::Unavailable(db.message().to_string());
            }
            RepositoryError::Query(err.to_string())
        }
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => RepositoryError::Unavailable(err.to_string()),
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        _ => RepositoryError::Query(err.to_string()),
    }
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
