use crate::domain_model::*;
use chrono::Duration;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session not found")]
    NotFound,
    #[error("session revoked")]
    Revoked,
    #[error("session expired")]
    Expired,
    #[error("session belongs to another subject")]
    Mismatch,
    #[error("store error: {0}")]
    Store(String),
}

/// Authoritative record of refresh sessions.
///
/// Implementations must serialize `rotate` and `revoke` per session id: of any
/// set of concurrent calls on one id, exactly one rotation may observe it active.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Open a new session for `user_id` with a fresh id, expiring after the store's refresh TTL.
    async fn create(&self, user_id: &SubjectId) -> Result<Session, SessionStoreError>;

    async fn get(&self, id: &Jti) -> Result<Session, SessionStoreError>;

    fn is_active(&self, session: &Session) -> bool;

    /// Revoke `old_id` and open its successor for the same user in one step.
    ///
    /// If the successor cannot be created the old session stays revoked.
    async fn rotate(
        &self,
        old_id: &Jti,
        claimed_user_id: &SubjectId,
    ) -> Result<Session, SessionStoreError>;

    /// Idempotent. Unknown ids are a no-op.
    async fn revoke(&self, id: &Jti) -> Result<(), SessionStoreError>;

    /// Revoke every still-active session of a login chain. Returns how many changed.
    async fn revoke_family(&self, family_id: &Jti) -> Result<usize, SessionStoreError>;

    /// Drop sessions whose `expires_at + grace` has passed. Returns how many were removed.
    async fn prune(&self, grace: Duration) -> Result<usize, SessionStoreError>;
}
