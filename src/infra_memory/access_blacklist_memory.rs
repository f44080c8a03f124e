use crate::domain_model::Jti;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-local blacklist. Lookups share a read lock; only inserts and
/// evictions take the write lock.
pub struct MemoryAccessBlacklist {
    entries: RwLock<HashMap<Jti, DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryAccessBlacklist {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, expired ones not yet evicted included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn evict_if_expired(&self, jti: &Jti, now: DateTime<Utc>) {
        let mut entries = self.entries.write();
        // Re-check under the write lock; a concurrent add may have refreshed it.
        if entries.get(jti).is_some_and(|expires_at| *expires_at <= now) {
            entries.remove(jti);
        }
    }
}

#[async_trait::async_trait]
impl AccessTokenBlacklist for MemoryAccessBlacklist {
    async fn add(&self, jti: &Jti, expires_at: DateTime<Utc>) -> Result<(), BlacklistError> {
        if expires_at <= self.clock.now() {
            return Ok(());
        }
        self.entries.write().insert(jti.clone(), expires_at);
        Ok(())
    }

    async fn contains(&self, jti: &Jti) -> Result<bool, BlacklistError> {
        let now = self.clock.now();
        match self.entries.read().get(jti) {
            None => return Ok(false),
            Some(expires_at) if *expires_at > now => return Ok(true),
            Some(_) => {}
        }
        self.evict_if_expired(jti, now);
        Ok(false)
    }

    async fn purge_expired(&self) -> Result<usize, BlacklistError> {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::ManualClock;
    use chrono::{Duration, TimeZone};

    fn blacklist() -> (Arc<ManualClock>, MemoryAccessBlacklist) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        (clock.clone(), MemoryAccessBlacklist::new(clock))
    }

    #[tokio::test]
    async fn entry_lives_until_ttl_then_is_evicted() {
        let (clock, blacklist) = blacklist();
        let jti = Jti::from("a1");

        blacklist
            .add(&jti, clock.now() + Duration::seconds(1))
            .await
            .unwrap();
        assert!(blacklist.contains(&jti).await.unwrap());
        assert_eq!(blacklist.len(), 1);

        clock.advance(Duration::seconds(1));
        assert!(!blacklist.contains(&jti).await.unwrap());
        assert_eq!(blacklist.len(), 0);
    }

    #[tokio::test]
    async fn already_expired_add_is_noop() {
        let (clock, blacklist) = blacklist();
        blacklist.add(&Jti::from("a1"), clock.now()).await.unwrap();
        blacklist
            .add(&Jti::from("a2"), clock.now() - Duration::seconds(30))
            .await
            .unwrap();
        assert!(blacklist.is_empty());
    }

    #[tokio::test]
    async fn unknown_is_not_contained() {
        let (_clock, blacklist) = blacklist();
        assert!(!blacklist.contains(&Jti::from("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn purge_drops_expired_entries() {
        let (clock, blacklist) = blacklist();
        blacklist
            .add(&Jti::from("short"), clock.now() + Duration::seconds(5))
            .await
            .unwrap();
        blacklist
            .add(&Jti::from("long"), clock.now() + Duration::seconds(500))
            .await
            .unwrap();

        clock.advance(Duration::seconds(10));
        assert_eq!(blacklist.purge_expired().await.unwrap(), 1);
        assert_eq!(blacklist.len(), 1);
        assert!(blacklist.contains(&Jti::from("long")).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_readers_see_consistent_state() {
        let (clock, blacklist) = blacklist();
        let blacklist = Arc::new(blacklist);
        let jti = Jti::from("shared");
        blacklist
            .add(&jti, clock.now() + Duration::seconds(60))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let blacklist = blacklist.clone();
            let jti = jti.clone();
            let clock = clock.clone();
            handles.push(tokio::spawn(async move {
                let other = Jti(format!("other-{i}"));
                blacklist
                    .add(&other, clock.now() + Duration::seconds(60))
                    .await
                    .unwrap();
                blacklist.contains(&jti).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(blacklist.len(), 17);
    }
}
