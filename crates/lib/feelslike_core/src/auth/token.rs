//! Signed token issuance and verification.
//!
//! Access and refresh tokens share one claim shape ([`TokenClaims`]) and one
//! HMAC secret; they differ in lifetime and in the `kind` claim. Verification
//! is stateless: whether a refresh token is still outstanding is decided by
//! [`super::session`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{TokenClaims, TokenKind};

/// Default access token lifetime: 1 hour.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(60 * 60);

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Length of the random nonce embedded in every token.
const NONCE_LEN: usize = 16;

/// Signing configuration, built once at startup and never mutated.
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenConfig {
    /// HS256 with the default lifetimes.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        }
    }

    /// Set the signing algorithm. Only the HMAC family is accepted by
    /// [`TokenService::new`].
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Parse and set the signing algorithm by name (e.g. `"HS512"`).
    pub fn with_algorithm_name(self, name: &str) -> Result<Self, AuthError> {
        let algorithm = Algorithm::from_str(name)
            .map_err(|_| AuthError::Validation(format!("unknown token algorithm '{name}'")))?;
        Ok(self.with_algorithm(algorithm))
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Identity recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: Uuid,
    pub nonce: String,
}

/// Issues and verifies signed tokens with a fixed configuration.
pub struct TokenService {
    config: TokenConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Result<Self, AuthError> {
        if config.secret.is_empty() {
            return Err(AuthError::Validation("token secret must not be empty".into()));
        }
        if !matches!(
            config.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::Validation(format!(
                "token algorithm {:?} needs a key pair; use HS256, HS384 or HS512",
                config.algorithm
            )));
        }

        for kind in [TokenKind::Access, TokenKind::Refresh] {
            expiry_after(Utc::now(), config.ttl(kind))?;
        }

        let mut validation = Validation::new(config.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        })
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Sign a token for `user_id` that expires after the kind's lifetime.
    pub fn issue_token(&self, user_id: Uuid, kind: TokenKind) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = expiry_after(now, self.config.ttl(kind))?;
        let claims = TokenClaims {
            sub: user_id.to_string(),
            nonce: generate_nonce(),
            kind,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(self.config.algorithm), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Check signature, expiry and kind. Does not consult revocation state.
    pub fn verify_token(&self, token: &str, kind: TokenKind) -> Result<VerifiedToken, AuthError> {
        let claims = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?
            .claims;
        if claims.kind != kind {
            return Err(AuthError::InvalidToken);
        }
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(VerifiedToken {
            user_id,
            nonce: claims.nonce,
        })
    }
}

/// `now + ttl`, or a validation error when the lifetime does not fit a timestamp.
fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, AuthError> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AuthError::Validation(format!("token lifetime {ttl:?} is out of range")))
}

fn generate_nonce() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(TokenConfig::new(secret)).unwrap()
    }

    #[test]
    fn issued_token_round_trips_subject() {
        let tokens = service("round-trip-secret");
        let user_id = Uuid::new_v4();
        let token = tokens.issue_token(user_id, TokenKind::Access).unwrap();
        let verified = tokens.verify_token(&token, TokenKind::Access).unwrap();
        assert_eq!(verified.user_id, user_id);
        assert_eq!(verified.nonce.len(), NONCE_LEN);
    }

    #[test]
    fn back_to_back_tokens_differ() {
        let tokens = service("nonce-secret");
        let user_id = Uuid::new_v4();
        let a = tokens.issue_token(user_id, TokenKind::Refresh).unwrap();
        let b = tokens.issue_token(user_id, TokenKind::Refresh).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = service("secret-a")
            .issue_token(Uuid::new_v4(), TokenKind::Access)
            .unwrap();
        let err = service("secret-b")
            .verify_token(&token, TokenKind::Access)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let tokens = service("kind-secret");
        let token = tokens.issue_token(Uuid::new_v4(), TokenKind::Access).unwrap();
        assert!(matches!(
            tokens.verify_token(&token, TokenKind::Refresh),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let secret = "expiry-secret";
        let claims = TokenClaims {
            sub: Uuid::new_v4().to_string(),
            nonce: "n".into(),
            kind: TokenKind::Access,
            exp: Utc::now().timestamp() - 10,
            iat: Utc::now().timestamp() - 100,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            service(secret).verify_token(&token, TokenKind::Access),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            service("s").verify_token("not.a.jwt", TokenKind::Access),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn lifetimes_follow_config() {
        let tokens = TokenService::new(
            TokenConfig::new("ttl-secret")
                .with_access_ttl(Duration::from_secs(60))
                .with_refresh_ttl(Duration::from_secs(600)),
        )
        .unwrap();
        let token = tokens.issue_token(Uuid::new_v4(), TokenKind::Refresh).unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        let claims = decode::<TokenClaims>(&token, &DecodingKey::from_secret(b""), &validation)
            .unwrap()
            .claims;
        assert_eq!(claims.exp - claims.iat, 600);
    }

    #[test]
    fn asymmetric_algorithms_are_refused() {
        let config = TokenConfig::new("s").with_algorithm_name("RS256").unwrap();
        assert!(TokenService::new(config).is_err());
        assert!(TokenConfig::new("s").with_algorithm_name("nope").is_err());
    }

    #[test]
    fn oversized_lifetime_is_refused_up_front() {
        let million_years = Duration::from_secs(1_000_000 * 31_557_600);
        let refresh = TokenConfig::new("s").with_refresh_ttl(million_years);
        assert!(matches!(
            TokenService::new(refresh),
            Err(AuthError::Validation(_))
        ));
        let access = TokenConfig::new("s").with_access_ttl(Duration::MAX);
        assert!(matches!(
            TokenService::new(access),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", TokenConfig::new("super-secret-value"));
        assert!(!rendered.contains("super-secret-value"));
    }
}
