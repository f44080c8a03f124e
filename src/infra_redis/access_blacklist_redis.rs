use crate::domain_model::Jti;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::sync::Arc;

/// Blacklist entries as `SET key <exp> EXAT <exp>`.
///
/// Redis expiry evicts entries on its own clock; the stored expiry is still
/// compared against the injected clock so both backends agree on `contains`.
pub struct RedisAccessBlacklist {
    conn: ConnectionManager,
    prefix: String,
    clock: Arc<dyn Clock>,
}

impl RedisAccessBlacklist {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        RedisAccessBlacklist {
            conn,
            prefix: prefix.into(),
            clock,
        }
    }

    fn key(&self, jti: &Jti) -> String {
        format!("{}:blacklist:{}", self.prefix, jti)
    }
}

fn store_err(e: redis::RedisError) -> BlacklistError {
    BlacklistError::Store(e.to_string())
}

#[async_trait::async_trait]
impl AccessTokenBlacklist for RedisAccessBlacklist {
    async fn add(&self, jti: &Jti, expires_at: DateTime<Utc>) -> Result<(), BlacklistError> {
        if expires_at <= self.clock.now() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let exp = expires_at.timestamp();
        let _: () = redis::cmd("SET")
            .arg(self.key(jti))
            .arg(exp)
            .arg("EXAT")
            .arg(exp)
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn contains(&self, jti: &Jti) -> Result<bool, BlacklistError> {
        let key = self.key(jti);
        let mut conn = self.conn.clone();
        let exp: Option<i64> = conn.get(&key).await.map_err(store_err)?;
        match exp {
            None => Ok(false),
            Some(exp) if exp > self.clock.now().timestamp() => Ok(true),
            Some(_) => {
                let _: () = conn.del(&key).await.map_err(store_err)?;
                Ok(false)
            }
        }
    }

    async fn purge_expired(&self) -> Result<usize, BlacklistError> {
        Ok(0)
    }
}
