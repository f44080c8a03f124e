use crate::application_port::*;
use crate::domain_model::SubjectId;
use chrono::{Duration, Utc};

const ACCESS_PREFIX: &str = "fake-access-token:";
const REFRESH_PREFIX: &str = "fake-refresh-token:";

#[derive(Debug, Default)]
pub struct FakeAuthSessionManager;

impl FakeAuthSessionManager {
    pub fn new() -> Self {
        Self
    }
}

// Tokens are the subject id behind a fixed prefix. Nothing is signed or remembered:
// refresh always succeeds and logout does nothing.
#[async_trait::async_trait]
impl AuthSessionManager for FakeAuthSessionManager {
    async fn login(&self, subject: &SubjectId) -> Result<AuthTokens, AuthError> {
        Ok(fake_tokens(subject))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        refresh_token
            .strip_prefix(REFRESH_PREFIX)
            .map(|subject| fake_tokens(&SubjectId::from(subject)))
            .ok_or(AuthError::Unauthorized)
    }

    async fn logout(&self, _refresh_token: &str, _access_token: Option<&str>) {}

    async fn authorize_request(&self, access_token: &str) -> Result<SubjectId, AuthError> {
        access_token
            .strip_prefix(ACCESS_PREFIX)
            .map(SubjectId::from)
            .ok_or(AuthError::Unauthorized)
    }
}

fn fake_tokens(subject: &SubjectId) -> AuthTokens {
    let now = Utc::now();
    AuthTokens {
        access_token: AccessToken(format!("{ACCESS_PREFIX}{subject}")),
        access_token_expires_at: now + Duration::minutes(5),
        refresh_token: RefreshToken(format!("{REFRESH_PREFIX}{subject}")),
        refresh_token_expires_at: now + Duration::days(7),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tokens_round_trip_subject() {
        let fake = FakeAuthSessionManager::new();
        let subject = SubjectId::from("user-7");
        let tokens = fake.login(&subject).await.unwrap();

        assert_eq!(fake.authorize_request(&tokens.access_token.0).await.unwrap(), subject);
        let again = fake.refresh(&tokens.refresh_token.0).await.unwrap();
        assert_eq!(again.refresh_token.0, tokens.refresh_token.0);
        assert_eq!(
            fake.authorize_request(&tokens.refresh_token.0).await.unwrap_err(),
            AuthError::Unauthorized
        );
    }
}
