use crate::domain_port::*;
use chrono::Duration;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub pruned_sessions: usize,
    pub purged_blacklist_entries: usize,
}

/// Periodic removal of session tombstones and expired blacklist entries.
/// Correctness never depends on it; it only bounds memory.
pub struct Housekeeper {
    session_store: Arc<dyn SessionStore>,
    access_blacklist: Arc<dyn AccessTokenBlacklist>,
    tombstone_grace: Duration,
    interval: std::time::Duration,
    cancellation_token: CancellationToken,
}

impl Housekeeper {
    pub fn new(
        session_store: Arc<dyn SessionStore>,
        access_blacklist: Arc<dyn AccessTokenBlacklist>,
        tombstone_grace: Duration,
        interval: std::time::Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            session_store,
            access_blacklist,
            tombstone_grace,
            interval,
            cancellation_token,
        }
    }

    pub async fn sweep(&self) -> anyhow::Result<SweepReport> {
        let pruned_sessions = self.session_store.prune(self.tombstone_grace).await?;
        let purged_blacklist_entries = self.access_blacklist.purge_expired().await?;
        Ok(SweepReport {
            pruned_sessions,
            purged_blacklist_entries,
        })
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("Housekeeper shutting down...");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep().await {
                        Ok(report) => tracing::debug!(?report, "housekeeping sweep done"),
                        Err(e) => tracing::error!("Housekeeper error: {:#}", e),
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::*;
    use crate::infra_memory::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn sweep_clears_expired_state() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemorySessionStore::new(clock.clone(), Duration::seconds(60)));
        let blacklist = Arc::new(MemoryAccessBlacklist::new(clock.clone()));
        store.create(&SubjectId::from("user-1")).await.unwrap();
        blacklist
            .add(&Jti::from("a1"), clock.now() + Duration::seconds(30))
            .await
            .unwrap();

        let housekeeper = Housekeeper::new(
            store.clone(),
            blacklist.clone(),
            Duration::seconds(10),
            std::time::Duration::from_secs(60),
            CancellationToken::new(),
        );
        assert_eq!(housekeeper.sweep().await.unwrap(), SweepReport::default());

        clock.advance(Duration::seconds(70));
        let report = housekeeper.sweep().await.unwrap();
        assert_eq!(report.pruned_sessions, 1);
        assert_eq!(report.purged_blacklist_entries, 1);
        assert!(store.is_empty());
        assert!(blacklist.is_empty());
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cancel = CancellationToken::new();
        let housekeeper = Housekeeper::new(
            Arc::new(MemorySessionStore::new(clock.clone(), Duration::seconds(60))),
            Arc::new(MemoryAccessBlacklist::new(clock)),
            Duration::seconds(0),
            std::time::Duration::from_millis(10),
            cancel.clone(),
        );
        let handle = tokio::spawn(async move { housekeeper.run().await });
        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
