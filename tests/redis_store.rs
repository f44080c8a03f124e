//! Needs a live server:
//! `REDIS_URL=redis://127.0.0.1:6379 cargo test --test redis_store -- --ignored`
use chrono::{Duration, Utc};
use redis::aio::ConnectionManager;
use sessionward::domain_model::*;
use sessionward::domain_port::*;
use sessionward::infra_redis::*;
use std::sync::Arc;

async fn connect() -> Option<ConnectionManager> {
    let url = std::env::var("REDIS_URL").ok()?;
    let client = redis::Client::open(url).unwrap();
    Some(client.get_connection_manager().await.unwrap())
}

fn run_prefix() -> String {
    format!("sessionward-test-{}", uuid::Uuid::new_v4())
}

fn session_store(conn: ConnectionManager, prefix: &str) -> Arc<RedisSessionStore> {
    Arc::new(RedisSessionStore::new(
        conn,
        prefix,
        Arc::new(SystemClock),
        Duration::minutes(10),
        Duration::minutes(1),
    ))
}

#[tokio::test]
#[ignore]
async fn rotate_is_single_use() {
    let Some(conn) = connect().await else { return };
    let store = session_store(conn, &run_prefix());
    let user = SubjectId::from("user-42");

    let first = store.create(&user).await.unwrap();
    assert_eq!(store.get(&first.id).await.unwrap(), first);

    let second = store.rotate(&first.id, &user).await.unwrap();
    assert_eq!(second.family_id, first.id);
    assert!(store.get(&first.id).await.unwrap().is_revoked());
    assert!(matches!(
        store.rotate(&first.id, &user).await.unwrap_err(),
        SessionStoreError::Revoked
    ));
    assert!(matches!(
        store.rotate(&second.id, &SubjectId::from("intruder")).await.unwrap_err(),
        SessionStoreError::Mismatch
    ));
    assert!(matches!(
        store.rotate(&Jti::from("missing"), &user).await.unwrap_err(),
        SessionStoreError::NotFound
    ));
}

#[tokio::test]
#[ignore]
async fn revoke_is_idempotent() {
    let Some(conn) = connect().await else { return };
    let store = session_store(conn, &run_prefix());
    let session = store.create(&SubjectId::from("user-42")).await.unwrap();

    store.revoke(&session.id).await.unwrap();
    let revoked_at = store.get(&session.id).await.unwrap().revoked_at;
    store.revoke(&session.id).await.unwrap();
    store.revoke(&Jti::from("missing")).await.unwrap();

    assert!(revoked_at.is_some());
    assert_eq!(store.get(&session.id).await.unwrap().revoked_at, revoked_at);
}

#[tokio::test]
#[ignore]
async fn revoke_family_reaches_successors() {
    let Some(conn) = connect().await else { return };
    let store = session_store(conn, &run_prefix());
    let user = SubjectId::from("user-42");
    let first = store.create(&user).await.unwrap();
    let second = store.rotate(&first.id, &user).await.unwrap();
    let other = store.create(&user).await.unwrap();

    assert_eq!(store.revoke_family(&first.family_id).await.unwrap(), 1);
    assert!(store.get(&second.id).await.unwrap().is_revoked());
    assert!(!store.get(&other.id).await.unwrap().is_revoked());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn concurrent_rotations_have_one_winner() {
    let Some(conn) = connect().await else { return };
    let store = session_store(conn, &run_prefix());
    let user = SubjectId::from("user-42");
    let first = store.create(&user).await.unwrap();

    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let store = store.clone();
            let user = user.clone();
            let id = first.id.clone();
            tokio::spawn(async move { store.rotate(&id, &user).await })
        })
        .collect();
    let mut winners = 0;
    for attempt in attempts {
        if attempt.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
#[ignore]
async fn blacklist_honours_expiry() {
    let Some(conn) = connect().await else { return };
    let blacklist = RedisAccessBlacklist::new(conn, run_prefix(), Arc::new(SystemClock));
    let live = Jti::from("live");
    let stale = Jti::from("stale");

    blacklist
        .add(&live, Utc::now() + Duration::minutes(5))
        .await
        .unwrap();
    blacklist
        .add(&stale, Utc::now() - Duration::seconds(1))
        .await
        .unwrap();

    assert!(blacklist.contains(&live).await.unwrap());
    assert!(!blacklist.contains(&stale).await.unwrap());
}
