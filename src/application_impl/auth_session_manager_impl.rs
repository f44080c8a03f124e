use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct AuthSessionConfig {
    pub access_ttl: Duration,
    /// When a rotated refresh token comes back, revoke every session of its chain.
    pub revoke_family_on_reuse: bool,
}

pub struct RealAuthSessionManager {
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
    access_blacklist: Arc<dyn AccessTokenBlacklist>,
    cfg: AuthSessionConfig,
}

impl RealAuthSessionManager {
    pub fn new(
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
        access_blacklist: Arc<dyn AccessTokenBlacklist>,
        cfg: AuthSessionConfig,
    ) -> Self {
        Self {
            token_codec,
            session_store,
            access_blacklist,
            cfg,
        }
    }

    fn issue_pair(&self, session: &Session) -> Result<AuthTokens, TokenError> {
        let access = self.token_codec.issue(
            &session.user_id,
            TokenType::Access,
            self.cfg.access_ttl,
        )?;
        let refresh = self.token_codec.issue_for_session(session)?;
        Ok(AuthTokens {
            access_token_expires_at: access.expires_at(),
            refresh_token_expires_at: refresh.expires_at(),
            access_token: AccessToken(access.token),
            refresh_token: RefreshToken(refresh.token),
        })
    }

    /// Undo a session that was opened but never handed out.
    async fn discard(&self, session: &Session) {
        if let Err(e) = self.session_store.revoke(&session.id).await {
            error!(session_id = %session.id, error = %e, "failed to discard unissued session");
        }
    }

    async fn try_refresh(&self, claims: &Claims) -> Result<AuthTokens, RejectReason> {
        if claims.typ != TokenType::Refresh {
            return Err(RejectReason::WrongType);
        }

        let session = match self.session_store.rotate(&claims.jti, &claims.sub).await {
            Ok(session) => session,
            Err(SessionStoreError::Revoked) => {
                self.on_reuse(claims).await;
                return Err(RejectReason::SessionRevoked);
            }
            Err(e) => return Err(e.into()),
        };

        match self.issue_pair(&session) {
            Ok(tokens) => {
                debug!(
                    old_session_id = %claims.jti,
                    session_id = %session.id,
                    "refresh token rotated"
                );
                Ok(tokens)
            }
            Err(e) => {
                // The old session is already spent; the caller has to log in again.
                self.discard(&session).await;
                Err(e.into())
            }
        }
    }

    async fn on_reuse(&self, claims: &Claims) {
        warn!(session_id = %claims.jti, user_id = %claims.sub, "revoked refresh token presented again");
        if !self.cfg.revoke_family_on_reuse {
            return;
        }
        let family_id = match self.session_store.get(&claims.jti).await {
            Ok(session) => session.family_id,
            Err(e) => {
                error!(session_id = %claims.jti, error = %e, "cannot load reused session");
                return;
            }
        };
        match self.session_store.revoke_family(&family_id).await {
            Ok(revoked) => {
                info!(family_id = %family_id, revoked, "login chain revoked after refresh token reuse")
            }
            Err(e) => error!(family_id = %family_id, error = %e, "failed to revoke login chain"),
        }
    }

    async fn try_authorize(&self, claims: &Claims) -> Result<(), RejectReason> {
        if claims.typ != TokenType::Access {
            return Err(RejectReason::WrongType);
        }
        if self.access_blacklist.contains(&claims.jti).await? {
            return Err(RejectReason::Blacklisted);
        }
        Ok(())
    }

    async fn revoke_refresh(&self, refresh_token: &str) {
        let claims = match self.token_codec.verify_ignoring_expiry(refresh_token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(reason = %e, "logout: refresh token not identifiable");
                return;
            }
        };
        if claims.typ != TokenType::Refresh {
            debug!(jti = %claims.jti, "logout: refresh slot holds an access token");
            return;
        }
        match self.session_store.revoke(&claims.jti).await {
            Ok(()) => info!(session_id = %claims.jti, user_id = %claims.sub, "session logged out"),
            Err(e) => error!(session_id = %claims.jti, error = %e, "logout: failed to revoke session"),
        }
    }

    async fn blacklist_access(&self, access_token: &str) {
        let claims = match self.token_codec.verify_ignoring_expiry(access_token) {
            Ok(claims) if claims.typ == TokenType::Access => claims,
            Ok(claims) => {
                debug!(jti = %claims.jti, "logout: access slot holds a refresh token");
                return;
            }
            Err(e) => {
                debug!(reason = %e, "logout: access token not identifiable");
                return;
            }
        };
        if let Err(e) = self
            .access_blacklist
            .add(&claims.jti, claims.expires_at())
            .await
        {
            error!(jti = %claims.jti, error = %e, "logout: failed to blacklist access token");
        }
    }
}

/// `jti` is `None` only when the token could not be verified at all.
fn unauthorized(operation: &'static str, jti: Option<&Jti>, reason: RejectReason) -> AuthError {
    let jti = jti.map(Jti::as_str).unwrap_or("-");
    match &reason {
        RejectReason::Backend(_) => error!(operation, jti, reason = %reason, "request rejected"),
        _ => warn!(operation, jti, reason = %reason, "request rejected"),
    }
    AuthError::Unauthorized
}

#[async_trait::async_trait]
impl AuthSessionManager for RealAuthSessionManager {
    async fn login(&self, subject: &SubjectId) -> Result<AuthTokens, AuthError> {
        let session = self
            .session_store
            .create(subject)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        match self.issue_pair(&session) {
            Ok(tokens) => {
                info!(user_id = %subject, session_id = %session.id, "login chain opened");
                Ok(tokens)
            }
            Err(e) => {
                self.discard(&session).await;
                Err(AuthError::Unavailable(e.to_string()))
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let claims = self
            .token_codec
            .verify(refresh_token)
            .map_err(|e| unauthorized("refresh", None, e.into()))?;
        self.try_refresh(&claims)
            .await
            .map_err(|reason| unauthorized("refresh", Some(&claims.jti), reason))
    }

    async fn logout(&self, refresh_token: &str, access_token: Option<&str>) {
        self.revoke_refresh(refresh_token).await;
        if let Some(access_token) = access_token {
            self.blacklist_access(access_token).await;
        }
    }

    async fn authorize_request(&self, access_token: &str) -> Result<SubjectId, AuthError> {
        let claims = self
            .token_codec
            .verify(access_token)
            .map_err(|e| unauthorized("authorize", None, e.into()))?;
        self.try_authorize(&claims)
            .await
            .map_err(|reason| unauthorized("authorize", Some(&claims.jti), reason))?;
        Ok(claims.sub)
    }
}
