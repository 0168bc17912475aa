//! CredentialStore and SubjectStore trait definitions.
//!
//! Implementations live in planeja-infra (`SqliteCredentialStore`,
//! `SqliteSubjectStore`) and in this crate (`MemoryCredentialStore`,
//! `FailoverCredentialStore`). Uses native async fn in traits (RPITIT,
//! Rust 2024 edition).

use planeja_types::credential::{CleanupReport, RefreshCredential};
use planeja_types::error::RepositoryError;
use planeja_types::identity::{NewSubject, SubjectRecord};
use uuid::Uuid;

/// Store for refresh credential persistence.
///
/// The credential repository exclusively owns credential records; the
/// session manager never mutates storage directly.
pub trait CredentialStore: Send + Sync {
    /// Persist a new credential. The secret must be unique among live rows.
    fn save(
        &self,
        credential: &RefreshCredential,
    ) -> impl std::future::Future<Output = Result<RefreshCredential, RepositoryError>> + Send;

    /// Look up a credential by its secret. A miss is `Ok(None)`, never an error.
    fn find_by_secret(
        &self,
        secret: &str,
    ) -> impl std::future::Future<Output = Result<Option<RefreshCredential>, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<RefreshCredential>, RepositoryError>> + Send;

    /// Delete by id, reporting whether a row was actually removed.
    ///
    /// Rotation relies on this: of N concurrent refreshes presenting the
    /// same secret, only the caller that observes `true` may proceed.
    fn delete_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete by secret. Absence is not an error (logout is idempotent).
    fn delete_by_secret(
        &self,
        secret: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List a subject's credentials, newest first.
    fn list_by_subject(
        &self,
        subject_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<RefreshCredential>, RepositoryError>> + Send;

    /// Remove every credential whose expiry has passed.
    fn cleanup_expired(
        &self,
    ) -> impl std::future::Future<Output = Result<CleanupReport, RepositoryError>> + Send;

    /// Cheap connectivity check used by the expiry sweeper before a cycle.
    fn probe(
        &self,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

// The sweeper and the session manager share one credential repository.
impl<T: CredentialStore> CredentialStore for std::sync::Arc<T> {
    async fn save(
        &self,
        credential: &RefreshCredential,
    ) -> Result<RefreshCredential, RepositoryError> {
        (**self).save(credential).await
    }

    async fn find_by_secret(
        &self,
        secret: &str,
    ) -> Result<Option<RefreshCredential>, RepositoryError> {
        (**self).find_by_secret(secret).await
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<RefreshCredential>, RepositoryError> {
        (**self).get_by_id(id).await
    }

    async fn delete_by_id(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        (**self).delete_by_id(id).await
    }

    async fn delete_by_secret(&self, secret: &str) -> Result<(), RepositoryError> {
        (**self).delete_by_secret(secret).await
    }

    async fn list_by_subject(
        &self,
        subject_id: &Uuid,
    ) -> Result<Vec<RefreshCredential>, RepositoryError> {
        (**self).list_by_subject(subject_id).await
    }

    async fn cleanup_expired(&self) -> Result<CleanupReport, RepositoryError> {
        (**self).cleanup_expired().await
    }

    async fn probe(&self) -> Result<(), RepositoryError> {
        (**self).probe().await
    }
}

/// Store for subject (principal) records.
///
/// Subjects are not part of the dual-backend failover scheme; only
/// credentials and conversations degrade to memory.
pub trait SubjectStore: Send + Sync {
    /// Create a subject. Duplicate email is `RepositoryError::Conflict`.
    fn create(
        &self,
        subject: &NewSubject,
    ) -> impl std::future::Future<Output = Result<SubjectRecord, RepositoryError>> + Send;

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<SubjectRecord>, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<SubjectRecord>, RepositoryError>> + Send;
}
