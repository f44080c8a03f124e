use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Duration, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use std::sync::Arc;

const SESSION_ROTATE: &str = include_str!("session_rotate.lua");
const SESSION_REVOKE: &str = include_str!("session_revoke.lua");
const SESSION_REVOKE_FAMILY: &str = include_str!("session_revoke_family.lua");

/// Session store backed by one Redis hash per session.
///
/// Rotation runs as a single Lua script, so Redis serializes it against every
/// other rotate/revoke on the same key. Keys expire at `expires_at + tombstone_grace`,
/// which is what prunes tombstones; [`SessionStore::prune`] has nothing left to do.
///
/// The rotate and family scripts derive session and family keys from prefixes
/// passed in ARGV, so every key carries the `{prefix}` hash tag and lands in one
/// cluster slot.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
    clock: Arc<dyn Clock>,
    refresh_ttl: Duration,
    tombstone_grace: Duration,
}

impl RedisSessionStore {
    pub fn new(
        conn: ConnectionManager,
        prefix: impl Into<String>,
        clock: Arc<dyn Clock>,
        refresh_ttl: Duration,
        tombstone_grace: Duration,
    ) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
            clock,
            refresh_ttl,
            tombstone_grace,
        }
    }

    fn session_prefix(&self) -> String {
        session_prefix(&self.prefix)
    }

    fn family_prefix(&self) -> String {
        family_prefix(&self.prefix)
    }

    fn key(&self, id: &Jti) -> String {
        format!("{}{}", self.session_prefix(), id)
    }

    fn family_key(&self, family_id: &Jti) -> String {
        format!("{}{}", self.family_prefix(), family_id)
    }

    fn key_expiry(&self, expires_at: DateTime<Utc>) -> i64 {
        (expires_at + self.tombstone_grace).timestamp()
    }
}

fn session_prefix(prefix: &str) -> String {
    format!("{{{prefix}}}:session:")
}

fn family_prefix(prefix: &str) -> String {
    format!("{{{prefix}}}:family:")
}

fn store_err(e: redis::RedisError) -> SessionStoreError {
    SessionStoreError::Store(e.to_string())
}

fn parse_session(fields: &HashMap<String, String>) -> Result<Session, SessionStoreError> {
    let text = |name: &str| {
        fields
            .get(name)
            .cloned()
            .ok_or_else(|| SessionStoreError::Store(format!("session field {name} missing")))
    };
    Ok(Session {
        id: Jti(text("id")?),
        user_id: SubjectId(text("user_id")?),
        family_id: Jti(text("family_id")?),
        created_at: parse_instant(&text("created_at")?)?,
        expires_at: parse_instant(&text("expires_at")?)?,
        revoked_at: fields
            .get("revoked_at")
            .map(|raw| parse_instant(raw))
            .transpose()?,
    })
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, SessionStoreError> {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| SessionStoreError::Store(format!("bad timestamp {raw:?}")))
}

/// Redis keeps second precision; hand back exactly what a later `get` would return.
fn whole_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, user_id: &SubjectId) -> Result<Session, SessionStoreError> {
        let now = whole_seconds(self.clock.now());
        let id = Jti::generate();
        let session = Session {
            id: id.clone(),
            user_id: user_id.clone(),
            family_id: id.clone(),
            created_at: now,
            expires_at: now + self.refresh_ttl,
            revoked_at: None,
        };
        let key = self.key(&id);
        let family_key = self.family_key(&session.family_id);
        let key_expiry = self.key_expiry(session.expires_at);
        let fields = [
            ("id", session.id.to_string()),
            ("user_id", session.user_id.to_string()),
            ("family_id", session.family_id.to_string()),
            ("created_at", session.created_at.timestamp().to_string()),
            ("expires_at", session.expires_at.timestamp().to_string()),
        ];

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(&key, &fields)
            .expire_at(&key, key_expiry)
            .sadd(&family_key, id.as_str())
            .expire_at(&family_key, key_expiry)
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(session)
    }

    async fn get(&self, id: &Jti) -> Result<Session, SessionStoreError> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> =
            conn.hgetall(self.key(id)).await.map_err(store_err)?;
        if fields.is_empty() {
            return Err(SessionStoreError::NotFound);
        }
        parse_session(&fields)
    }

    fn is_active(&self, session: &Session) -> bool {
        session.is_active(self.clock.now())
    }

    async fn rotate(
        &self,
        old_id: &Jti,
        claimed_user_id: &SubjectId,
    ) -> Result<Session, SessionStoreError> {
        let now = whole_seconds(self.clock.now());
        let id = Jti::generate();
        let expires_at = now + self.refresh_ttl;

        let mut conn = self.conn.clone();
        let (status, family_id): (i64, String) = Script::new(SESSION_ROTATE)
            .key(self.key(old_id))
            .key(self.key(&id))
            .arg(claimed_user_id.as_str())
            .arg(now.timestamp())
            .arg(id.as_str())
            .arg(expires_at.timestamp())
            .arg(self.key_expiry(expires_at))
            .arg(self.family_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        match status {
            1 => Ok(Session {
                id,
                user_id: claimed_user_id.clone(),
                family_id: Jti(family_id),
                created_at: now,
                expires_at,
                revoked_at: None,
            }),
            -1 => Err(SessionStoreError::NotFound),
            -2 => Err(SessionStoreError::Revoked),
            -3 => Err(SessionStoreError::Expired),
            -4 => Err(SessionStoreError::Mismatch),
            other => Err(SessionStoreError::Store(format!(
                "unknown rotate status {other}"
            ))),
        }
    }

    async fn revoke(&self, id: &Jti) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = Script::new(SESSION_REVOKE)
            .key(self.key(id))
            .arg(self.clock.now().timestamp())
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn revoke_family(&self, family_id: &Jti) -> Result<usize, SessionStoreError> {
        let mut conn = self.conn.clone();
        let revoked: i64 = Script::new(SESSION_REVOKE_FAMILY)
            .key(self.family_key(family_id))
            .arg(self.clock.now().timestamp())
            .arg(self.session_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(revoked.max(0) as usize)
    }

    async fn prune(&self, _grace: Duration) -> Result<usize, SessionStoreError> {
        Ok(0)
    }
}
