//! In-memory credential store used as the failover backend.
//!
//! A single mutex guards the map so concurrent rotations cannot interleave
//! a delete and an insert non-atomically: `delete_by_id` removes and reports
//! in one critical section, which is what makes refresh a single-winner
//! operation on this backend.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use planeja_types::credential::{BackendKind, CleanupReport, RefreshCredential};
use planeja_types::error::RepositoryError;
use uuid::Uuid;

use crate::auth::store::CredentialStore;

#[derive(Default)]
pub struct MemoryCredentialStore {
    records: Mutex<HashMap<Uuid, RefreshCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, RefreshCredential>> {
        // A poisoned mutex means a panic mid-operation; propagating the
        // inner state is still safe for a plain map.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    async fn save(
        &self,
        credential: &RefreshCredential,
    ) -> Result<RefreshCredential, RepositoryError> {
        let mut records = self.lock();
        if records.values().any(|r| r.secret == credential.secret) {
            return Err(RepositoryError::Conflict(
                "duplicate credential secret".to_string(),
            ));
        }
        records.insert(credential.id, credential.clone());
        Ok(credential.clone())
    }

    async fn find_by_secret(
        &self,
        secret: &str,
    ) -> Result<Option<RefreshCredential>, RepositoryError> {
        let records = self.lock();
        Ok(records.values().find(|r| r.secret == secret).cloned())
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<RefreshCredential>, RepositoryError> {
        Ok(self.lock().get(id).cloned())
    }

    async fn delete_by_id(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        Ok(self.lock().remove(id).is_some())
    }

    async fn delete_by_secret(&self, secret: &str) -> Result<(), RepositoryError> {
        let mut records = self.lock();
        if let Some(id) = records
            .values()
            .find(|r| r.secret == secret)
            .map(|r| r.id)
        {
            records.remove(&id);
        }
        Ok(())
    }

    async fn list_by_subject(
        &self,
        subject_id: &Uuid,
    ) -> Result<Vec<RefreshCredential>, RepositoryError> {
        let records = self.lock();
        let mut list: Vec<RefreshCredential> = records
            .values()
            .filter(|r| r.subject_id == *subject_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(list)
    }

    async fn cleanup_expired(&self) -> Result<CleanupReport, RepositoryError> {
        let now = Utc::now();
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, r| !r.is_expired(now));
        Ok(CleanupReport {
            removed: (before - records.len()) as u64,
            backend: BackendKind::Memory,
        })
    }

    async fn probe(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
