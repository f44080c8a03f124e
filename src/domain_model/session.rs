use crate::domain_model::{Jti, SubjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A refresh session. `id` is the jti of the refresh token bound to it.
///
/// Sessions are tombstoned rather than deleted: once `revoked_at` is set it never
/// reverts, which is what makes a replayed refresh token detectable.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Jti,
    pub user_id: SubjectId,
    /// Id of the first session in this login chain, shared by every rotated successor.
    pub family_id: Jti,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn session(now: DateTime<Utc>) -> Session {
        Session {
            id: Jti::from("s1"),
            user_id: SubjectId::from("user-1"),
            family_id: Jti::from("s1"),
            created_at: now,
            expires_at: now + Duration::seconds(60),
            revoked_at: None,
        }
    }

    #[test]
    fn active_until_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let s = session(now);
        assert!(s.is_active(now));
        assert!(s.is_active(now + Duration::seconds(59)));
        assert!(!s.is_active(now + Duration::seconds(60)));
    }

    #[test]
    fn revoked_is_never_active() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut s = session(now);
        s.revoked_at = Some(now);
        assert!(s.is_revoked());
        assert!(!s.is_active(now));
    }
}
