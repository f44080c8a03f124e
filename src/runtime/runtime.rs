use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::runtime::*;
use crate::settings::Settings;
use anyhow::anyhow;
use chrono::Duration;
use jsonwebtoken::Algorithm;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[cfg(debug_assertions)]
const DEV_SIGNING_KEY: Option<&str> = Some("sessionward-dev-only-signing-key-0000");
#[cfg(not(debug_assertions))]
const DEV_SIGNING_KEY: Option<&str> = None;

/// Everything a caller needs, assembled from settings.
pub struct Runtime {
    pub auth_session_manager: Arc<dyn AuthSessionManager>,
    housekeeper: Arc<Housekeeper>,
    housekeeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Runtime {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let refresh_ttl = Duration::seconds(settings.auth.refresh_ttl_secs);
        let tombstone_grace = Duration::seconds(settings.store.tombstone_grace_secs);

        let (session_store, access_blacklist): (Arc<dyn SessionStore>, Arc<dyn AccessTokenBlacklist>) =
            match settings.store.backend.as_str() {
                "memory" => (
                    Arc::new(MemorySessionStore::new(clock.clone(), refresh_ttl)),
                    Arc::new(MemoryAccessBlacklist::new(clock.clone())),
                ),
                "redis" => {
                    let url = settings
                        .store
                        .redis_url
                        .as_deref()
                        .ok_or_else(|| anyhow!("store.redis_url is required for the redis backend"))?;
                    let redis_client = redis::Client::open(url)?;
                    let redis_manager = redis_client.get_connection_manager().await?;
                    (
                        Arc::new(RedisSessionStore::new(
                            redis_manager.clone(),
                            settings.store.prefix.clone(),
                            clock.clone(),
                            refresh_ttl,
                            tombstone_grace,
                        )),
                        Arc::new(RedisAccessBlacklist::new(
                            redis_manager,
                            settings.store.prefix.clone(),
                            clock.clone(),
                        )),
                    )
                }
                other => return Err(anyhow!("Unknown store backend: {}", other)),
            };

        let auth_session_manager: Arc<dyn AuthSessionManager> =
            match settings.auth.backend.as_str() {
                "fake" => Arc::new(FakeAuthSessionManager::new()),
                "real" => {
                    let token_codec: Arc<dyn TokenCodec> =
                        Arc::new(build_codec(settings, clock.clone())?);
                    Arc::new(RealAuthSessionManager::new(
                        token_codec,
                        session_store.clone(),
                        access_blacklist.clone(),
                        AuthSessionConfig {
                            access_ttl: Duration::seconds(settings.auth.access_ttl_secs),
                            revoke_family_on_reuse: settings.auth.revoke_family_on_reuse,
                        },
                    ))
                }
                other => return Err(anyhow!("Unknown auth backend: {}", other)),
            };

        let cancel = CancellationToken::new();
        let housekeeper = Arc::new(Housekeeper::new(
            session_store,
            access_blacklist,
            tombstone_grace,
            std::time::Duration::from_secs(settings.store.sweep_interval_secs),
            cancel.clone(),
        ));
        let runner = housekeeper.clone();
        let housekeeper_handle = tokio::spawn(async move {
            let _ = runner.run().await;
        });

        info!(
            store = %settings.store.backend,
            auth = %settings.auth.backend,
            "runtime started"
        );

        Ok(Self {
            auth_session_manager,
            housekeeper,
            housekeeper_handle: Mutex::new(Some(housekeeper_handle)),
            cancel,
        })
    }

    pub async fn sweep(&self) -> anyhow::Result<SweepReport> {
        self.housekeeper.sweep().await
    }

    pub async fn shutdown(&self) {
        info!("runtime shutting down...");

        self.cancel.cancel();

        let handle = match self.housekeeper_handle.lock() {
            Ok(mut lock) => lock.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let r = handle.await;
            info!("housekeeper handle dropped: {:?}", r);
        }
    }
}

fn build_codec(settings: &Settings, clock: Arc<dyn Clock>) -> anyhow::Result<JwtCodec> {
    let algorithm = Algorithm::from_str(&settings.auth.algorithm)
        .map_err(|e| anyhow!("unknown signing algorithm {:?}: {}", settings.auth.algorithm, e))?;

    let keys = match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            let secret = match std::env::var(&settings.auth.signing_key_env) {
                Ok(secret) => secret,
                Err(_) => {
                    let fallback = DEV_SIGNING_KEY.ok_or_else(|| {
                        anyhow!("{} is not set", settings.auth.signing_key_env)
                    })?;
                    warn!(
                        env = %settings.auth.signing_key_env,
                        "signing key not set, using the development key"
                    );
                    fallback.to_string()
                }
            };
            SigningKeys::hmac(secret.as_bytes())?
        }
        _ => {
            let private_path = settings
                .auth
                .private_key_path
                .as_deref()
                .ok_or_else(|| anyhow!("auth.private_key_path is required for {:?}", algorithm))?;
            let public_path = settings
                .auth
                .public_key_path
                .as_deref()
                .ok_or_else(|| anyhow!("auth.public_key_path is required for {:?}", algorithm))?;
            SigningKeys::from_pem(
                algorithm,
                &std::fs::read(private_path)?,
                &std::fs::read(public_path)?,
            )?
        }
    };

    let cfg = JwtConfig {
        algorithm,
        leeway_secs: settings.auth.leeway_secs,
    };
    Ok(JwtCodec::new(cfg, keys, clock)?)
}
