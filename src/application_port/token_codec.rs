use crate::domain_model::*;
use chrono::Duration;

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum TokenError {
    #[error("token malformed")]
    Malformed,
    #[error("token signature mismatch")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("invalid key material: {0}")]
    KeyMaterial(String),
}

/// Signs and verifies compact `header.payload.signature` tokens.
///
/// Stateless apart from immutable key material; all calls are CPU-bound.
pub trait TokenCodec: Send + Sync {
    /// Issue a token with a fresh jti, `iat = now` and `exp = now + ttl`.
    fn issue(
        &self,
        subject: &SubjectId,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError>;

    /// Issue the refresh token bound to `session`: its jti is the session id
    /// and its lifetime matches the session's.
    fn issue_for_session(&self, session: &Session) -> Result<IssuedToken, TokenError>;

    fn verify(&self, token: &str) -> Result<Claims, TokenError>;

    /// Same checks as [`TokenCodec::verify`] except expiry. Only for identifying
    /// what to revoke; never for granting access.
    fn verify_ignoring_expiry(&self, token: &str) -> Result<Claims, TokenError>;
}
