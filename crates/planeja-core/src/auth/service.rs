//! Session manager: register, login, refresh rotation, logout, revoke.
//!
//! The service never touches storage directly -- every credential mutation
//! goes through the [`CredentialStore`] port. Refresh is single-use: the
//! presented credential is claimed (deleted) before a replacement is issued,
//! and the claim reports whether this caller actually removed the row, so a
//! replayed or concurrently rotated secret always fails.

use chrono::{Duration, Utc};
use planeja_types::credential::{CredentialMetadata, RefreshCredential};
use planeja_types::error::AuthError;
use planeja_types::identity::{AccessClaims, NewSubject, Subject};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::store::{CredentialStore, SubjectStore};

/// Password hashing seam. The implementation must compare in constant time.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;
    fn verify(&self, hash: &str, password: &str) -> bool;
}

/// Access-token signing and refresh-secret minting seam.
pub trait TokenService: Send + Sync {
    fn sign_access(&self, subject: &Subject) -> Result<String, AuthError>;
    fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError>;
    /// A fresh opaque refresh secret with at least 48 bytes of entropy.
    fn new_refresh_secret(&self) -> String;
}

// The signer is shared between the session manager and the websocket
// token verifier.
impl<T: TokenService> TokenService for std::sync::Arc<T> {
    fn sign_access(&self, subject: &Subject) -> Result<String, AuthError> {
        (**self).sign_access(subject)
    }
    fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        (**self).verify_access(token)
    }
    fn new_refresh_secret(&self) -> String {
        (**self).new_refresh_secret()
    }
}

/// Request metadata recorded on issued credentials.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Everything a successful register/login/refresh hands back to the caller.
///
/// The access token goes in the response body; the refresh secret goes in
/// the HTTP-only cookie and is never listed afterwards.
#[derive(Debug, Clone)]
pub struct SessionBundle {
    pub subject: Subject,
    pub access_token: String,
    pub refresh_secret: String,
}

pub struct SessionService<C, S, H, T>
where
    C: CredentialStore,
    S: SubjectStore,
    H: PasswordHasher,
    T: TokenService,
{
    credentials: C,
    subjects: S,
    hasher: H,
    tokens: T,
    refresh_ttl_days: i64,
}

impl<C, S, H, T> SessionService<C, S, H, T>
where
    C: CredentialStore,
    S: SubjectStore,
    H: PasswordHasher,
    T: TokenService,
{
    pub fn new(credentials: C, subjects: S, hasher: H, tokens: T, refresh_ttl_days: i64) -> Self {
        Self {
            credentials,
            subjects,
            hasher,
            tokens,
            refresh_ttl_days,
        }
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    /// Create a subject and open a session for it.
    pub async fn register(
        &self,
        registration: NewRegistration,
        ctx: RequestContext,
    ) -> Result<SessionBundle, AuthError> {
        if self
            .subjects
            .find_by_email(&registration.email)
            .await?
            .is_some()
        {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hasher.hash(&registration.password)?;
        let record = self
            .subjects
            .create(&NewSubject {
                name: registration.name,
                email: registration.email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost the uniqueness race to a concurrent registration.
                planeja_types::error::RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        info!(subject_id = %record.id, "subject registered");
        self.issue_session(&record.subject(), &ctx).await
    }

    /// Verify credentials and open a session.
    ///
    /// Failure never reveals whether the email or the password was wrong.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ctx: RequestContext,
    ) -> Result<SessionBundle, AuthError> {
        let record = self
            .subjects
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(&record.password_hash, password) {
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_session(&record.subject(), &ctx).await
    }

    /// Sign a short-lived access token and persist a fresh refresh
    /// credential for the subject.
    pub async fn issue_session(
        &self,
        subject: &Subject,
        ctx: &RequestContext,
    ) -> Result<SessionBundle, AuthError> {
        let access_token = self.tokens.sign_access(subject)?;
        let secret = self.tokens.new_refresh_secret();
        let now = Utc::now();

        let credential = RefreshCredential {
            id: Uuid::now_v7(),
            subject_id: subject.id,
            secret: secret.clone(),
            issued_at: now,
            expires_at: now + Duration::days(self.refresh_ttl_days),
            source_ip: ctx.source_ip.clone(),
            user_agent: ctx.user_agent.clone(),
        };
        self.credentials.save(&credential).await?;

        Ok(SessionBundle {
            subject: subject.clone(),
            access_token,
            refresh_secret: secret,
        })
    }

    /// Rotate a refresh credential: claim the presented one, issue a new
    /// access token and a new credential.
    ///
    /// A replayed secret fails with `InvalidRefreshToken` after the first
    /// successful rotation, even if the first response was lost in transit.
    pub async fn refresh(
        &self,
        presented_secret: &str,
        ctx: RequestContext,
    ) -> Result<SessionBundle, AuthError> {
        let credential = self
            .credentials
            .find_by_secret(presented_secret)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if credential.is_expired(Utc::now()) {
            let _ = self.credentials.delete_by_id(&credential.id).await?;
            return Err(AuthError::ExpiredRefreshToken);
        }

        // Claim the credential. Of N concurrent refreshes presenting the
        // same secret, exactly one observes the removal.
        if !self.credentials.delete_by_id(&credential.id).await? {
            return Err(AuthError::InvalidRefreshToken);
        }

        let record = self
            .subjects
            .get_by_id(&credential.subject_id)
            .await?
            .ok_or(AuthError::SubjectNotFound)?;

        debug!(subject_id = %record.id, "refresh credential rotated");
        self.issue_session(&record.subject(), &ctx).await
    }

    /// Delete the credential behind a presented secret. Absence is fine.
    pub async fn logout(&self, presented_secret: &str) -> Result<(), AuthError> {
        self.credentials.delete_by_secret(presented_secret).await?;
        Ok(())
    }

    /// List a subject's live credentials, newest first, without secrets.
    pub async fn list_active(
        &self,
        subject_id: &Uuid,
    ) -> Result<Vec<CredentialMetadata>, AuthError> {
        let credentials = self.credentials.list_by_subject(subject_id).await?;
        Ok(credentials.iter().map(CredentialMetadata::from).collect())
    }

    /// Revoke one credential by id. The caller must own it.
    pub async fn revoke(
        &self,
        subject_id: &Uuid,
        credential_id: &Uuid,
    ) -> Result<(), AuthError> {
        let credential = self
            .credentials
            .get_by_id(credential_id)
            .await?
            .ok_or(AuthError::CredentialNotFound)?;

        if credential.subject_id != *subject_id {
            return Err(AuthError::NotOwner);
        }

        let _ = self.credentials.delete_by_id(credential_id).await?;
        info!(subject_id = %subject_id, credential_id = %credential_id, "credential revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::MemoryCredentialStore;
    use chrono::DateTime;
    use planeja_types::error::RepositoryError;
    use planeja_types::identity::SubjectRecord;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    /// Minimal subject store for exercising the service.
    #[derive(Default)]
    struct MemorySubjectStore {
        records: Mutex<HashMap<Uuid, SubjectRecord>>,
    }

    impl SubjectStore for MemorySubjectStore {
        async fn create(&self, subject: &NewSubject) -> Result<SubjectRecord, RepositoryError> {
            let mut records = self.records.lock().unwrap();
            if records.values().any(|r| r.email == subject.email) {
                return Err(RepositoryError::Conflict("email".to_string()));
            }
            let record = SubjectRecord {
                id: Uuid::now_v7(),
                name: subject.name.clone(),
                email: subject.email.clone(),
                password_hash: subject.password_hash.clone(),
                created_at: Utc::now(),
            };
            records.insert(record.id, record.clone());
            Ok(record)
        }

        async fn find_by_email(
            &self,
            email: &str,
        ) -> Result<Option<SubjectRecord>, RepositoryError> {
            let records = self.records.lock().unwrap();
            Ok(records.values().find(|r| r.email == email).cloned())
        }

        async fn get_by_id(&self, id: &Uuid) -> Result<Option<SubjectRecord>, RepositoryError> {
            Ok(self.records.lock().unwrap().get(id).cloned())
        }
    }

    /// Reversible "hash" -- the real Argon2 implementation lives in infra.
    struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash(&self, password: &str) -> Result<String, AuthError> {
            Ok(format!("plain:{password}"))
        }
        fn verify(&self, hash: &str, password: &str) -> bool {
            hash == format!("plain:{password}")
        }
    }

    /// Deterministic token service with unique secrets per call.
    struct CountingTokens {
        counter: AtomicU64,
    }

    impl CountingTokens {
        fn new() -> Self {
            Self {
                counter: AtomicU64::new(0),
            }
        }
    }

    impl TokenService for CountingTokens {
        fn sign_access(&self, subject: &Subject) -> Result<String, AuthError> {
            Ok(format!("access-{}", subject.id))
        }
        fn verify_access(&self, _token: &str) -> Result<AccessClaims, AuthError> {
            Err(AuthError::Token("not used in these tests".to_string()))
        }
        fn new_refresh_secret(&self) -> String {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            format!("secret-{n}-{}", Uuid::now_v7())
        }
    }

    type TestService =
        SessionService<MemoryCredentialStore, MemorySubjectStore, PlainHasher, CountingTokens>;

    fn service() -> TestService {
        SessionService::new(
            MemoryCredentialStore::new(),
            MemorySubjectStore::default(),
            PlainHasher,
            CountingTokens::new(),
            7,
        )
    }

    fn registration(email: &str) -> NewRegistration {
        NewRegistration {
            name: "Ana".to_string(),
            email: email.to_string(),
            password: "hunter22".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let svc = service();
        let bundle = svc
            .register(registration("ana@example.com"), RequestContext::default())
            .await
            .unwrap();
        assert!(!bundle.refresh_secret.is_empty());

        let login = svc
            .login("ana@example.com", "hunter22", RequestContext::default())
            .await
            .unwrap();
        assert_eq!(login.subject.id, bundle.subject.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let svc = service();
        svc.register(registration("ana@example.com"), RequestContext::default())
            .await
            .unwrap();
        let err = svc
            .register(registration("ana@example.com"), RequestContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn login_failure_is_generic() {
        let svc = service();
        svc.register(registration("ana@example.com"), RequestContext::default())
            .await
            .unwrap();

        let wrong_password = svc
            .login("ana@example.com", "wrong", RequestContext::default())
            .await
            .unwrap_err();
        let wrong_email = svc
            .login("nobody@example.com", "hunter22", RequestContext::default())
            .await
            .unwrap_err();
        assert_eq!(wrong_password.to_string(), wrong_email.to_string());
    }

    #[tokio::test]
    async fn rotation_is_single_use() {
        let svc = service();
        let bundle = svc
            .register(registration("ana@example.com"), RequestContext::default())
            .await
            .unwrap();
        let c1 = bundle.refresh_secret;

        let rotated = svc.refresh(&c1, RequestContext::default()).await.unwrap();
        let c2 = rotated.refresh_secret;
        assert_ne!(c1, c2);

        // Replaying the rotated secret fails.
        let err = svc.refresh(&c1, RequestContext::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));

        // The new secret works.
        svc.refresh(&c2, RequestContext::default()).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_refresh_has_exactly_one_winner() {
        let svc = Arc::new(service());
        let bundle = svc
            .register(registration("ana@example.com"), RequestContext::default())
            .await
            .unwrap();
        let secret = bundle.refresh_secret;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let svc = Arc::clone(&svc);
            let secret = secret.clone();
            handles.push(tokio::spawn(async move {
                svc.refresh(&secret, RequestContext::default()).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn expired_credential_is_deleted_on_refresh() {
        let svc = service();
        let bundle = svc
            .register(registration("ana@example.com"), RequestContext::default())
            .await
            .unwrap();

        // Force the stored credential into the past.
        let stored = svc
            .credentials()
            .find_by_secret(&bundle.refresh_secret)
            .await
            .unwrap()
            .unwrap();
        let _ = svc.credentials().delete_by_id(&stored.id).await.unwrap();
        let mut expired = stored.clone();
        expired.expires_at = DateTime::<Utc>::MIN_UTC + Duration::days(1);
        svc.credentials().save(&expired).await.unwrap();

        let err = svc
            .refresh(&bundle.refresh_secret, RequestContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ExpiredRefreshToken));

        // The expired row was removed as part of the failure.
        assert!(svc
            .credentials()
            .find_by_secret(&bundle.refresh_secret)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let svc = service();
        let bundle = svc
            .register(registration("ana@example.com"), RequestContext::default())
            .await
            .unwrap();

        svc.logout(&bundle.refresh_secret).await.unwrap();
        svc.logout(&bundle.refresh_secret).await.unwrap();
        svc.logout("never-existed").await.unwrap();

        let err = svc
            .refresh(&bundle.refresh_secret, RequestContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn list_active_and_revoke_ownership() {
        let svc = service();
        let ana = svc
            .register(registration("ana@example.com"), RequestContext::default())
            .await
            .unwrap();
        // Second device login.
        svc.login("ana@example.com", "hunter22", RequestContext::default())
            .await
            .unwrap();
        let bruno = svc
            .register(registration("bruno@example.com"), RequestContext::default())
            .await
            .unwrap();

        let ana_list = svc.list_active(&ana.subject.id).await.unwrap();
        assert_eq!(ana_list.len(), 2);

        // Bruno cannot revoke Ana's credential.
        let target = ana_list[0].id;
        let err = svc.revoke(&bruno.subject.id, &target).await.unwrap_err();
        assert!(matches!(err, AuthError::NotOwner));

        // Ana can.
        svc.revoke(&ana.subject.id, &target).await.unwrap();
        assert_eq!(svc.list_active(&ana.subject.id).await.unwrap().len(), 1);

        // Revoking a missing credential is a not-found, not a forbidden.
        let err = svc.revoke(&ana.subject.id, &target).await.unwrap_err();
        assert!(matches!(err, AuthError::CredentialNotFound));
    }

    #[tokio::test]
    async fn issued_credentials_carry_request_metadata() {
        let svc = service();
        let ctx = RequestContext {
            source_ip: Some("203.0.113.9".to_string()),
            user_agent: Some("test-agent/1.0".to_string()),
        };
        let bundle = svc
            .register(registration("ana@example.com"), ctx)
            .await
            .unwrap();

        let list = svc.list_active(&bundle.subject.id).await.unwrap();
        assert_eq!(list[0].source_ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(list[0].user_agent.as_deref(), Some("test-agent/1.0"));
    }
}
