//! Refresh credential types.
//!
//! A refresh credential is a long-lived opaque secret a client exchanges for
//! a new short-lived access token. Credentials are rotated on every use:
//! a successful refresh deletes the presented credential and issues a new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// A stored refresh credential.
///
/// `secret` is unique across all live credentials and is never exposed
/// through listing endpoints -- see [`CredentialMetadata`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshCredential {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub secret: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RefreshCredential {
    /// Whether this credential has passed its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Credential metadata safe to return to clients (no secret).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialMetadata {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl From<&RefreshCredential> for CredentialMetadata {
    fn from(c: &RefreshCredential) -> Self {
        Self {
            id: c.id,
            subject_id: c.subject_id,
            issued_at: c.issued_at,
            expires_at: c.expires_at,
            source_ip: c.source_ip.clone(),
            user_agent: c.user_agent.clone(),
        }
    }
}

/// Which backend served a repository operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Durable,
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Durable => write!(f, "durable"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Result of an expired-credential cleanup pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CleanupReport {
    pub removed: u64,
    pub backend: BackendKind,
}
