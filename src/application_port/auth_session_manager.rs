use crate::application_port::TokenError;
use crate::domain_model::*;
use crate::domain_port::{BlacklistError, SessionStoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// The only errors callers ever see. Rejection details stay in the logs.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Internal reason a token was refused. Logged, then collapsed into
/// [`AuthError::Unauthorized`] so callers cannot tell forged from expired from replayed.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum RejectReason {
    #[error("malformed")]
    Malformed,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("expired")]
    Expired,
    #[error("wrong token type")]
    WrongType,
    #[error("session not found")]
    SessionNotFound,
    #[error("session revoked")]
    SessionRevoked,
    #[error("session expired")]
    SessionExpired,
    #[error("session mismatch")]
    SessionMismatch,
    #[error("blacklisted")]
    Blacklisted,
    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<TokenError> for RejectReason {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => RejectReason::Malformed,
            TokenError::SignatureMismatch => RejectReason::SignatureMismatch,
            TokenError::Expired => RejectReason::Expired,
            TokenError::Signing(e) | TokenError::KeyMaterial(e) => RejectReason::Backend(e),
        }
    }
}

impl From<SessionStoreError> for RejectReason {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::NotFound => RejectReason::SessionNotFound,
            SessionStoreError::Revoked => RejectReason::SessionRevoked,
            SessionStoreError::Expired => RejectReason::SessionExpired,
            SessionStoreError::Mismatch => RejectReason::SessionMismatch,
            SessionStoreError::Store(e) => RejectReason::Backend(e),
        }
    }
}

impl From<BlacklistError> for RejectReason {
    fn from(err: BlacklistError) -> Self {
        match err {
            BlacklistError::Store(e) => RejectReason::Backend(e),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait AuthSessionManager: Send + Sync {
    /// Open a login chain for a subject whose credentials were verified upstream.
    async fn login(&self, subject: &SubjectId) -> Result<AuthTokens, AuthError>;

    /// Exchange a refresh token for a new pair. Each refresh token works once.
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;

    /// Revoke whatever session the tokens identify. Never fails.
    async fn logout(&self, refresh_token: &str, access_token: Option<&str>);

    async fn authorize_request(&self, access_token: &str) -> Result<SubjectId, AuthError>;
}
