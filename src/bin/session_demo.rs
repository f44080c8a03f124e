/// Walks one login chain end to end against the in-memory backend, with a
/// manual clock so expiry can be shown without waiting.
///
/// $ cargo run --bin session_demo
use chrono::{Duration, Utc};
use futures_util::future::join_all;
use jsonwebtoken::Algorithm;
use sessionward::application_impl::*;
use sessionward::application_port::*;
use sessionward::domain_model::SubjectId;
use sessionward::domain_port::*;
use sessionward::infra_memory::*;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::new("session_demo=debug,sessionward=debug");

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();


    // region initialization

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let key = std::env::var("SESSIONWARD_SIGNING_KEY")
        .unwrap_or_else(|_| "session-demo-signing-key-not-for-production".to_string())
        .into_bytes();
    let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtCodec::new(
        JwtConfig::new(Algorithm::HS256),
        SigningKeys::hmac(&key)?,
        clock.clone(),
    )?);
    let session_store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(
        clock.clone(),
        Duration::days(7),
    ));
    let access_blacklist: Arc<dyn AccessTokenBlacklist> =
        Arc::new(MemoryAccessBlacklist::new(clock.clone()));

    let manager: Arc<dyn AuthSessionManager> = Arc::new(RealAuthSessionManager::new(
        token_codec,
        session_store,
        access_blacklist,
        AuthSessionConfig {
            access_ttl: Duration::minutes(5),
            revoke_family_on_reuse: false,
        },
    ));

    // endregion


    // use cases

    let user = SubjectId::from("user-42");
    let first = manager.login(&user).await?;
    tracing::debug!("login: {:?}", first);

    let subject = manager.authorize_request(&first.access_token.0).await?;
    tracing::debug!("authorized as {}", subject);

    let second = manager.refresh(&first.refresh_token.0).await?;
    tracing::debug!("refreshed: {:?}", second);

    let replay = manager.refresh(&first.refresh_token.0).await;
    tracing::debug!("replaying the spent refresh token: {:?}", replay);

    manager
        .logout(&second.refresh_token.0, Some(&second.access_token.0))
        .await;
    tracing::debug!(
        "after logout, new access token: {:?}",
        manager.authorize_request(&second.access_token.0).await
    );
    tracing::debug!(
        "after logout, old access token: {:?}",
        manager.authorize_request(&first.access_token.0).await
    );

    clock.advance(Duration::minutes(5));
    tracing::debug!(
        "five minutes later, old access token: {:?}",
        manager.authorize_request(&first.access_token.0).await
    );


    // refresh race: only one caller may win the rotation

    let raced = manager.login(&user).await?;
    let attempts = (0..8).map(|_| {
        let manager = manager.clone();
        let token = raced.refresh_token.0.clone();
        tokio::spawn(async move { manager.refresh(&token).await })
    });
    let results = join_all(attempts).await;
    let winners = results
        .iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    tracing::info!("{} of {} concurrent refreshes succeeded", winners, results.len());

    Ok(())
}
