use crate::domain_model::Jti;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, thiserror::Error)]
pub enum BlacklistError {
    #[error("store error: {0}")]
    Store(String),
}

/// Access-token ids revoked before their natural expiry.
///
/// An entry past its `expires_at` is indistinguishable from one never added.
#[async_trait::async_trait]
pub trait AccessTokenBlacklist: Send + Sync {
    /// No-op when `expires_at` is already in the past.
    async fn add(&self, jti: &Jti, expires_at: DateTime<Utc>) -> Result<(), BlacklistError>;

    /// Expired entries found here are evicted.
    async fn contains(&self, jti: &Jti) -> Result<bool, BlacklistError>;

    /// Remove every expired entry. Returns how many were dropped.
    async fn purge_expired(&self) -> Result<usize, BlacklistError>;
}
