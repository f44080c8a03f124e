use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::Algorithm;
use sessionward::application_impl::*;
use sessionward::application_port::*;
use sessionward::domain_model::SubjectId;
use sessionward::domain_port::*;
use sessionward::infra_memory::*;
use std::sync::Arc;

const SECRET: &[u8] = b"lifecycle-test-secret-0123456789abcdef";

struct Harness {
    clock: Arc<ManualClock>,
    store: Arc<MemorySessionStore>,
    blacklist: Arc<MemoryAccessBlacklist>,
    manager: RealAuthSessionManager,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    ));
    let codec = JwtCodec::new(
        JwtConfig::new(Algorithm::HS256),
        SigningKeys::hmac(SECRET).unwrap(),
        clock.clone(),
    )
    .unwrap();
    let store = Arc::new(MemorySessionStore::new(clock.clone(), Duration::seconds(604800)));
    let blacklist = Arc::new(MemoryAccessBlacklist::new(clock.clone()));
    let manager = RealAuthSessionManager::new(
        Arc::new(codec),
        store.clone(),
        blacklist.clone(),
        AuthSessionConfig {
            access_ttl: Duration::seconds(300),
            revoke_family_on_reuse: false,
        },
    );
    Harness {
        clock,
        store,
        blacklist,
        manager,
    }
}

#[tokio::test]
async fn login_refresh_logout_walkthrough() {
    let h = harness();
    let user = SubjectId::from("user-42");

    let t0 = h.clock.now();
    let first = h.manager.login(&user).await.unwrap();
    assert_eq!(first.access_token_expires_at, t0 + Duration::seconds(300));
    assert_eq!(first.refresh_token_expires_at, t0 + Duration::seconds(604800));
    assert_eq!(
        h.manager.authorize_request(&first.access_token.0).await.unwrap(),
        user
    );

    h.clock.advance(Duration::seconds(60));
    let second = h.manager.refresh(&first.refresh_token.0).await.unwrap();
    assert_ne!(second.refresh_token.0, first.refresh_token.0);
    assert_eq!(
        h.manager.refresh(&first.refresh_token.0).await.unwrap_err(),
        AuthError::Unauthorized
    );

    h.manager
        .logout(&second.refresh_token.0, Some(&second.access_token.0))
        .await;
    assert_eq!(
        h.manager.authorize_request(&second.access_token.0).await.unwrap_err(),
        AuthError::Unauthorized
    );
    assert_eq!(
        h.manager.refresh(&second.refresh_token.0).await.unwrap_err(),
        AuthError::Unauthorized
    );

    // The first access token was never blacklisted; it lives out its TTL.
    assert_eq!(
        h.manager.authorize_request(&first.access_token.0).await.unwrap(),
        user
    );
    h.clock.set(t0 + Duration::seconds(299));
    assert!(h.manager.authorize_request(&first.access_token.0).await.is_ok());
    h.clock.set(t0 + Duration::seconds(300));
    assert_eq!(
        h.manager.authorize_request(&first.access_token.0).await.unwrap_err(),
        AuthError::Unauthorized
    );
}

#[tokio::test]
async fn blacklist_entry_does_not_outlive_token() {
    let h = harness();
    let tokens = h.manager.login(&SubjectId::from("user-42")).await.unwrap();

    h.manager
        .logout(&tokens.refresh_token.0, Some(&tokens.access_token.0))
        .await;
    assert_eq!(h.blacklist.len(), 1);

    h.clock.advance(Duration::seconds(300));
    assert_eq!(h.blacklist.purge_expired().await.unwrap(), 1);
    assert!(h.blacklist.is_empty());
}

#[tokio::test]
async fn logout_twice_is_harmless() {
    let h = harness();
    let tokens = h.manager.login(&SubjectId::from("user-42")).await.unwrap();

    h.manager
        .logout(&tokens.refresh_token.0, Some(&tokens.access_token.0))
        .await;
    h.manager
        .logout(&tokens.refresh_token.0, Some(&tokens.access_token.0))
        .await;

    assert_eq!(h.store.len(), 1);
    assert_eq!(h.blacklist.len(), 1);
    assert_eq!(
        h.manager.authorize_request(&tokens.access_token.0).await.unwrap_err(),
        AuthError::Unauthorized
    );
}

#[tokio::test]
async fn separate_logins_are_independent() {
    let h = harness();
    let user = SubjectId::from("user-42");
    let phone = h.manager.login(&user).await.unwrap();
    let laptop = h.manager.login(&user).await.unwrap();

    h.manager.logout(&phone.refresh_token.0, None).await;

    assert!(h.manager.refresh(&phone.refresh_token.0).await.is_err());
    assert!(h.manager.refresh(&laptop.refresh_token.0).await.is_ok());
    // Logout without an access token leaves it usable.
    assert!(h.manager.authorize_request(&phone.access_token.0).await.is_ok());
}

#[tokio::test]
async fn refresh_token_expires_with_its_session() {
    let h = harness();
    let tokens = h.manager.login(&SubjectId::from("user-42")).await.unwrap();

    h.clock.advance(Duration::seconds(604800));
    assert_eq!(
        h.manager.refresh(&tokens.refresh_token.0).await.unwrap_err(),
        AuthError::Unauthorized
    );
}
