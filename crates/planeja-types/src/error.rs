use thiserror::Error;

/// Errors from repository operations (used by trait definitions in
/// planeja-core).
///
/// `Unavailable` is the infrastructure-shaped class: the backing store is
/// unprovisioned or unreachable (missing table/schema, permission or auth
/// failure, dead connection). It is the only variant that may trigger the
/// permanent switch to the in-memory fallback store. Data-level rejections
/// (`Query`, `Conflict`, `NotFound`) always surface to the caller unchanged.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("entity not found")]
    NotFound,
}

impl RepositoryError {
    /// Whether this error should trip the durable-to-memory failover.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(_))
    }
}

/// Errors from the session/credential lifecycle.
///
/// Authentication failures deliberately never reveal which field was wrong.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email already in use")]
    EmailTaken,

    #[error("refresh token missing")]
    MissingRefreshToken,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("refresh token expired")]
    ExpiredRefreshToken,

    #[error("token not found")]
    CredentialNotFound,

    #[error("forbidden")]
    NotOwner,

    #[error("user not found")]
    SubjectNotFound,

    #[error("password hashing error: {0}")]
    PasswordHash(String),

    #[error("token error: {0}")]
    Token(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors from conversation operations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat not found")]
    ConversationNotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors from the text-generation collaborator.
///
/// These never surface as request failures: the chat service absorbs them
/// into a deterministic placeholder reply.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(String),

    #[error("generation stream error: {0}")]
    Stream(String),

    #[error("generation API error ({status}): {message}")]
    Api { status: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_classification() {
        assert!(RepositoryError::Unavailable("no such table".into()).is_infrastructure());
        assert!(!RepositoryError::Query("syntax error".into()).is_infrastructure());
        assert!(!RepositoryError::Conflict("duplicate".into()).is_infrastructure());
        assert!(!RepositoryError::NotFound.is_infrastructure());
    }

    #[test]
    fn test_auth_error_messages_are_generic() {
        // Login failures must not leak which field was wrong.
        let err = AuthError::InvalidCredentials;
        assert_eq!(err.to_string(), "invalid email or password");
    }

    #[test]
    fn test_repository_error_wraps_into_auth_error() {
        let err: AuthError = RepositoryError::Query("boom".into()).into();
        assert!(matches!(err, AuthError::Repository(_)));
    }

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::Api {
            status: 429,
            message: "quota".into(),
        };
        assert!(err.to_string().contains("429"));
    }
}
