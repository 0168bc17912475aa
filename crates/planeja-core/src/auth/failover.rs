//! Credential repository with automatic durable-to-memory failover.
//!
//! Every operation first attempts the durable backend. The first
//! infrastructure-shaped failure (`RepositoryError::Unavailable` -- missing
//! schema, permission failure, unreachable store) permanently switches the
//! repository to its in-memory store for the rest of the process lifetime.
//! Data-level errors (conflict, query, not-found) surface to the caller
//! unchanged and never trigger the switch: a transient data error must not
//! silently discard durability.

use planeja_types::credential::{CleanupReport, RefreshCredential};
use planeja_types::error::RepositoryError;
use uuid::Uuid;

use crate::auth::memory::MemoryCredentialStore;
use crate::auth::store::CredentialStore;
use crate::failover::{with_failover, FallbackFlag};

pub struct FailoverCredentialStore<D: CredentialStore> {
    durable: D,
    fallback: MemoryCredentialStore,
    flag: FallbackFlag,
}

impl<D: CredentialStore> FailoverCredentialStore<D> {
    pub fn new(durable: D) -> Self {
        Self {
            durable,
            fallback: MemoryCredentialStore::new(),
            flag: FallbackFlag::new(),
        }
    }

    /// Whether this repository has degraded to its in-memory store.
    pub fn using_memory(&self) -> bool {
        self.flag.active()
    }

    fn note_failure(&self, err: &RepositoryError) {
        if self.flag.trip() {
            tracing::warn!(
                reason = %err,
                "credential store degraded to in-memory fallback for the rest of this process"
            );
        }
    }
}

impl<D: CredentialStore> CredentialStore for FailoverCredentialStore<D> {
    async fn save(
        &self,
        credential: &RefreshCredential,
    ) -> Result<RefreshCredential, RepositoryError> {
        with_failover!(
            self,
            self.durable.save(credential).await,
            self.fallback.save(credential).await
        )
    }

    async fn find_by_secret(
        &self,
        secret: &str,
    ) -> Result<Option<RefreshCredential>, RepositoryError> {
        with_failover!(
            self,
            self.durable.find_by_secret(secret).await,
            self.fallback.find_by_secret(secret).await
        )
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<RefreshCredential>, RepositoryError> {
        with_failover!(
            self,
            self.durable.get_by_id(id).await,
            self.fallback.get_by_id(id).await
        )
    }

    async fn delete_by_id(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        with_failover!(
            self,
            self.durable.delete_by_id(id).await,
            self.fallback.delete_by_id(id).await
        )
    }

    async fn delete_by_secret(&self, secret: &str) -> Result<(), RepositoryError> {
        with_failover!(
            self,
            self.durable.delete_by_secret(secret).await,
            self.fallback.delete_by_secret(secret).await
        )
    }

    async fn list_by_subject(
        &self,
        subject_id: &Uuid,
    ) -> Result<Vec<RefreshCredential>, RepositoryError> {
        with_failover!(
            self,
            self.durable.list_by_subject(subject_id).await,
            self.fallback.list_by_subject(subject_id).await
        )
    }

    async fn cleanup_expired(&self) -> Result<CleanupReport, RepositoryError> {
        with_failover!(
            self,
            self.durable.cleanup_expired().await,
            self.fallback.cleanup_expired().await
        )
    }

    async fn probe(&self) -> Result<(), RepositoryError> {
        // Once degraded, the fallback store is always reachable.
        if self.flag.active() {
            return Ok(());
        }
        self.durable.probe().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use planeja_types::credential::BackendKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Durable store stub that fails every call with a configurable error.
    struct BrokenStore {
        infrastructure: bool,
        calls: AtomicUsize,
    }

    impl BrokenStore {
        fn new(infrastructure: bool) -> Self {
            Self {
                infrastructure,
                calls: AtomicUsize::new(0),
            }
        }

        fn fail<T>(&self) -> Result<T, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.infrastructure {
                Err(RepositoryError::Unavailable(
                    "could not find the table".to_string(),
                ))
            } else {
                Err(RepositoryError::Query("syntax error".to_string()))
            }
        }
    }

    impl CredentialStore for BrokenStore {
        async fn save(
            &self,
            _credential: &RefreshCredential,
        ) -> Result<RefreshCredential, RepositoryError> {
            self.fail()
        }
        async fn find_by_secret(
            &self,
            _secret: &str,
        ) -> Result<Option<RefreshCredential>, RepositoryError> {
            self.fail()
        }
        async fn get_by_id(
            &self,
            _id: &Uuid,
        ) -> Result<Option<RefreshCredential>, RepositoryError> {
            self.fail()
        }
        async fn delete_by_id(&self, _id: &Uuid) -> Result<bool, RepositoryError> {
            self.fail()
        }
        async fn delete_by_secret(&self, _secret: &str) -> Result<(), RepositoryError> {
            self.fail()
        }
        async fn list_by_subject(
            &self,
            _subject_id: &Uuid,
        ) -> Result<Vec<RefreshCredential>, RepositoryError> {
            self.fail()
        }
        async fn cleanup_expired(&self) -> Result<CleanupReport, RepositoryError> {
            self.fail()
        }
        async fn probe(&self) -> Result<(), RepositoryError> {
            self.fail()
        }
    }

    fn credential(secret: &str) -> RefreshCredential {
        let now = Utc::now();
        RefreshCredential {
            id: Uuid::now_v7(),
            subject_id: Uuid::now_v7(),
            secret: secret.to_string(),
            issued_at: now,
            expires_at: now + Duration::days(7),
            source_ip: None,
            user_agent: None,
        }
    }

    #[tokio::test]
    async fn infrastructure_error_switches_permanently() {
        let store = FailoverCredentialStore::new(BrokenStore::new(true));
        assert!(!store.using_memory());

        // First call trips the flag and is served by the fallback.
        let c = credential("s1");
        store.save(&c).await.unwrap();
        assert!(store.using_memory());

        // All subsequent operations succeed against memory without ever
        // touching the durable backend again.
        let found = store.find_by_secret("s1").await.unwrap().unwrap();
        assert_eq!(found.id, c.id);
        let report = store.cleanup_expired().await.unwrap();
        assert_eq!(report.backend, BackendKind::Memory);
        assert_eq!(store.durable.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn data_error_propagates_without_switching() {
        let store = FailoverCredentialStore::new(BrokenStore::new(false));

        let err = store.save(&credential("s1")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Query(_)));
        assert!(!store.using_memory());

        // Still attempting the durable backend.
        let err = store.find_by_secret("s1").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Query(_)));
        assert_eq!(store.durable.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn probe_short_circuits_after_switch() {
        let store = FailoverCredentialStore::new(BrokenStore::new(true));
        assert!(store.probe().await.is_err());

        store.save(&credential("s1")).await.unwrap();
        assert!(store.probe().await.is_ok());
    }
}
