use crate::application_port::{TokenCodec, TokenError};
use crate::domain_model::*;
use crate::domain_port::Clock;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, crypto, encode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::str::FromStr;
use std::sync::Arc;

/// Value of the `typ` header field on every token this codec signs.
pub const TOKEN_HEADER_TYPE: &str = "AUTH";

/// Shortest HMAC secret accepted.
pub const MIN_HMAC_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// The one algorithm this deployment signs with and accepts.
    pub algorithm: Algorithm,
    /// Clock-skew allowance in seconds on `exp`. Zero unless configured.
    pub leeway_secs: i64,
}

impl JwtConfig {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            leeway_secs: 0,
        }
    }
}

/// Key pair for the pinned algorithm. Symmetric algorithms use the same secret for both halves.
pub struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    symmetric: bool,
}

impl SigningKeys {
    pub fn hmac(secret: &[u8]) -> Result<Self, TokenError> {
        if secret.len() < MIN_HMAC_SECRET_LEN {
            return Err(TokenError::KeyMaterial(format!(
                "hmac secret must be at least {} bytes, got {}",
                MIN_HMAC_SECRET_LEN,
                secret.len()
            )));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            symmetric: true,
        })
    }

    pub fn from_pem(
        algorithm: Algorithm,
        private_pem: &[u8],
        public_pem: &[u8],
    ) -> Result<Self, TokenError> {
        let key_err = |e: jsonwebtoken::errors::Error| TokenError::KeyMaterial(e.to_string());
        let (encoding, decoding) = match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => (
                EncodingKey::from_rsa_pem(private_pem).map_err(key_err)?,
                DecodingKey::from_rsa_pem(public_pem).map_err(key_err)?,
            ),
            Algorithm::ES256 | Algorithm::ES384 => (
                EncodingKey::from_ec_pem(private_pem).map_err(key_err)?,
                DecodingKey::from_ec_pem(public_pem).map_err(key_err)?,
            ),
            Algorithm::EdDSA => (
                EncodingKey::from_ed_pem(private_pem).map_err(key_err)?,
                DecodingKey::from_ed_pem(public_pem).map_err(key_err)?,
            ),
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                return Err(TokenError::KeyMaterial(format!(
                    "{algorithm:?} takes a shared secret, not a PEM key pair"
                )));
            }
        };
        Ok(Self {
            encoding,
            decoding,
            symmetric: false,
        })
    }
}

fn is_symmetric(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    )
}

#[derive(Debug, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: Option<String>,
}

/// Compact-token codec over `jsonwebtoken`'s signing primitives.
///
/// Verification never trusts the header to pick an algorithm: the signature is
/// checked with the pinned one over the raw `header.payload` text before either
/// segment is decoded.
pub struct JwtCodec {
    cfg: JwtConfig,
    keys: SigningKeys,
    clock: Arc<dyn Clock>,
}

impl JwtCodec {
    pub fn new(
        cfg: JwtConfig,
        keys: SigningKeys,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        if is_symmetric(cfg.algorithm) != keys.symmetric {
            return Err(TokenError::KeyMaterial(format!(
                "key material does not fit algorithm {:?}",
                cfg.algorithm
            )));
        }
        let cfg = JwtConfig {
            leeway_secs: cfg.leeway_secs.max(0),
            ..cfg
        };
        Ok(Self { cfg, keys, clock })
    }

    fn sign(&self, claims: Claims) -> Result<IssuedToken, TokenError> {
        let mut header = Header::new(self.cfg.algorithm);
        header.typ = Some(TOKEN_HEADER_TYPE.to_string());
        let token = encode(&header, &claims, &self.keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(IssuedToken { token, claims })
    }

    fn decode(&self, token: &str, check_expiry: bool) -> Result<Claims, TokenError> {
        let mut segments = token.split('.');
        let (header, payload, signature) = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() => (h, p, s),
            _ => return Err(TokenError::Malformed),
        };

        let message = &token[..header.len() + 1 + payload.len()];
        let valid = crypto::verify(
            signature,
            message.as_bytes(),
            &self.keys.decoding,
            self.cfg.algorithm,
        )
        .map_err(|_| TokenError::SignatureMismatch)?;
        if !valid {
            return Err(TokenError::SignatureMismatch);
        }

        let header: TokenHeader = decode_segment(header)?;
        // Anything other than the pinned algorithm, `none` included, is a forgery attempt.
        match Algorithm::from_str(&header.alg) {
            Ok(alg) if alg == self.cfg.algorithm => {}
            _ => return Err(TokenError::SignatureMismatch),
        }
        if header.typ.as_deref() != Some(TOKEN_HEADER_TYPE) {
            return Err(TokenError::Malformed);
        }

        let claims: Claims = decode_segment(payload)?;
        if check_expiry
            && self.clock.now().timestamp() >= claims.exp.saturating_add(self.cfg.leeway_secs)
        {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

impl TokenCodec for JwtCodec {
    fn issue(
        &self,
        subject: &SubjectId,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let iat = self.clock.now();
        let exp = iat + ttl;
        self.sign(Claims {
            sub: subject.clone(),
            typ: token_type,
            jti: Jti::generate(),
            iat: iat.timestamp(),
            exp: exp.timestamp(),
        })
    }

    fn issue_for_session(&self, session: &Session) -> Result<IssuedToken, TokenError> {
        self.sign(Claims {
            sub: session.user_id.clone(),
            typ: TokenType::Refresh,
            jti: session.id.clone(),
            iat: session.created_at.timestamp(),
            exp: session.expires_at.timestamp(),
        })
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode(token, true)
    }

    fn verify_ignoring_expiry(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode(token, false)
    }
}
