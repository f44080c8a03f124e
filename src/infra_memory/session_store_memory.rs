use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::debug;

/// Process-local session store.
///
/// `DashMap` shards its lock, so `rotate`/`revoke` on one id hold that shard's
/// write lock for the whole check-and-mark step while unrelated ids proceed
/// on other shards.
///
/// Sessions of a login chain are indexed by family. A successor is inserted
/// while holding its family's entry, and `revoke_family` closes the family under
/// that same entry, so a chain revocation can never miss a concurrent rotation.
/// Lock order is always family, then session.
pub struct MemorySessionStore {
    sessions: DashMap<Jti, Session>,
    families: DashMap<Jti, Family>,
    clock: Arc<dyn Clock>,
    refresh_ttl: Duration,
}

#[derive(Debug, Default)]
struct Family {
    members: Vec<Jti>,
    closed: bool,
}

impl MemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>, refresh_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            families: DashMap::new(),
            clock,
            refresh_ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn new_session(
        &self,
        user_id: SubjectId,
        family_id: Option<Jti>,
        now: DateTime<Utc>,
    ) -> Session {
        let id = Jti::generate();
        Session {
            family_id: family_id.unwrap_or_else(|| id.clone()),
            id,
            user_id,
            created_at: now,
            expires_at: now + self.refresh_ttl,
            revoked_at: None,
        }
    }

    /// Caller must hold the session's family entry.
    fn insert_session(&self, session: &Session) -> Result<(), SessionStoreError> {
        match self.sessions.entry(session.id.clone()) {
            Entry::Occupied(_) => Err(SessionStoreError::Store(format!(
                "session id collision: {}",
                session.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(())
            }
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user_id: &SubjectId) -> Result<Session, SessionStoreError> {
        let session = self.new_session(user_id.clone(), None, self.clock.now());
        match self.families.entry(session.family_id.clone()) {
            Entry::Occupied(_) => {
                return Err(SessionStoreError::Store(format!(
                    "family id collision: {}",
                    session.family_id
                )));
            }
            Entry::Vacant(slot) => {
                self.insert_session(&session)?;
                slot.insert(Family {
                    members: vec![session.id.clone()],
                    closed: false,
                });
            }
        }
        debug!(session_id = %session.id, user_id = %user_id, "session created");
        Ok(session)
    }

    async fn get(&self, id: &Jti) -> Result<Session, SessionStoreError> {
        self.sessions
            .get(id)
            .map(|s| s.value().clone())
            .ok_or(SessionStoreError::NotFound)
    }

    fn is_active(&self, session: &Session) -> bool {
        session.is_active(self.clock.now())
    }

    async fn rotate(
        &self,
        old_id: &Jti,
        claimed_user_id: &SubjectId,
    ) -> Result<Session, SessionStoreError> {
        let now = self.clock.now();
        let (user_id, family_id) = {
            let mut old = self
                .sessions
                .get_mut(old_id)
                .ok_or(SessionStoreError::NotFound)?;
            if old.revoked_at.is_some() {
                return Err(SessionStoreError::Revoked);
            }
            if now >= old.expires_at {
                return Err(SessionStoreError::Expired);
            }
            if &old.user_id != claimed_user_id {
                return Err(SessionStoreError::Mismatch);
            }
            old.revoked_at = Some(now);
            (old.user_id.clone(), old.family_id.clone())
        };
        // The session guard is gone before the family entry is taken.
        let session = self.new_session(user_id, Some(family_id), now);
        {
            let mut family = self.families.get_mut(&session.family_id).ok_or_else(|| {
                SessionStoreError::Store(format!("family {} missing", session.family_id))
            })?;
            if family.closed {
                debug!(old_session_id = %old_id, "rotation lost to a chain revocation");
                return Err(SessionStoreError::Revoked);
            }
            self.insert_session(&session)?;
            family.members.push(session.id.clone());
        }
        debug!(old_session_id = %old_id, session_id = %session.id, "session rotated");
        Ok(session)
    }

    async fn revoke(&self, id: &Jti) -> Result<(), SessionStoreError> {
        if let Some(mut session) = self.sessions.get_mut(id) {
            if session.revoked_at.is_none() {
                session.revoked_at = Some(self.clock.now());
                debug!(session_id = %id, "session revoked");
            }
        }
        Ok(())
    }

    async fn revoke_family(&self, family_id: &Jti) -> Result<usize, SessionStoreError> {
        let now = self.clock.now();
        let members = match self.families.get_mut(family_id) {
            Some(mut family) => {
                family.closed = true;
                family.members.clone()
            }
            None => return Ok(0),
        };
        // A closed family takes no new members, so the snapshot is complete.
        let mut revoked = 0;
        for id in &members {
            if let Some(mut session) = self.sessions.get_mut(id) {
                if session.is_active(now) {
                    session.revoked_at = Some(now);
                    revoked += 1;
                }
            }
        }
        Ok(revoked)
    }

    async fn prune(&self, grace: Duration) -> Result<usize, SessionStoreError> {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.expires_at + grace > now);
        self.families.retain(|_, family| {
            family.members.retain(|id| self.sessions.contains_key(id));
            !family.members.is_empty()
        });
        Ok(before.saturating_sub(self.sessions.len()))
    }
}
