//! Subject (authenticated principal) types and access-token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered principal, as exposed to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// A subject row including the password hash. Never serialized to clients.
#[derive(Debug, Clone)]
pub struct SubjectRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl SubjectRecord {
    pub fn subject(&self) -> Subject {
        Subject {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Input for creating a subject. The password is already hashed by the
/// session service before it reaches a store.
#[derive(Debug, Clone)]
pub struct NewSubject {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Claims carried by a signed access token.
///
/// `iat`/`exp` are unix timestamps in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}
