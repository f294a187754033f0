//! Signed identity tokens
//!
//! Tokens are HS256 JWTs carrying the subject, issue time and expiry. The
//! service is stateless: there is no revocation list, a token is valid
//! until it expires.
//!
//! Expiry is tracked to the millisecond in `exp_ms`; the registered `exp`
//! claim is that instant rounded up to the next whole second for other JWT
//! consumers.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use warden_config::TokenConfig;

use crate::error::{RbacError, RbacResult};

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (user identity)
    pub sub: String,
    /// Token ID
    pub jti: String,
    /// Issued at (seconds since the epoch)
    pub iat: i64,
    /// Expiration time (seconds since the epoch, rounded up)
    pub exp: i64,
    /// Expiration time (milliseconds since the epoch)
    pub exp_ms: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

impl TokenClaims {
    /// Expiry as a timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.exp_ms)
    }
}

/// Issues and validates identity tokens
pub struct TokenService {
    issuer: String,
    audience: String,
    default_ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service; fails when the secret is missing
    pub fn new(config: &TokenConfig) -> RbacResult<Self> {
        config
            .validate_for_signing()
            .map_err(|e| RbacError::invalid_config(e.to_string()))?;

        let default_ttl = Duration::from_std(config.ttl)
            .map_err(|e| RbacError::invalid_config(format!("token ttl out of range: {}", e)))?;

        Ok(Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            default_ttl,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
        })
    }

    /// Lifetime used by [`issue_default`](Self::issue_default)
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token for `subject` valid for `ttl` from now
    pub fn issue(&self, subject: &str, ttl: Duration) -> RbacResult<String> {
        self.issue_at(subject, ttl, Utc::now())
    }

    /// Issue a token with the configured lifetime
    pub fn issue_default(&self, subject: &str) -> RbacResult<String> {
        self.issue(subject, self.default_ttl)
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// The token expires exactly `ttl` after `now`, to the millisecond.
    pub fn issue_at(&self, subject: &str, ttl: Duration, now: DateTime<Utc>) -> RbacResult<String> {
        if subject.is_empty() {
            return Err(RbacError::invalid_rule("token subject cannot be empty"));
        }
        if ttl.num_milliseconds() <= 0 {
            return Err(RbacError::InvalidTtl {
                message: format!("ttl must be positive, got {}ms", ttl.num_milliseconds()),
            });
        }

        let exp_ms = now
            .timestamp_millis()
            .checked_add(ttl.num_milliseconds())
            .ok_or_else(|| RbacError::InvalidTtl {
                message: format!("ttl of {}ms is out of range", ttl.num_milliseconds()),
            })?;

        let claims = TokenClaims {
            sub: subject.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp_ms.div_euclid(1000) + i64::from(exp_ms.rem_euclid(1000) > 0),
            exp_ms,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| RbacError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Validate a token and return its subject
    pub fn validate(&self, token: &str) -> RbacResult<String> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as if the current time were `now`
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> RbacResult<String> {
        self.decode_at(token, now).map(|claims| claims.sub)
    }

    /// Validate a token and return all of its claims
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> RbacResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = 0;
        // Expiry is checked below against the caller's clock
        validation.validate_exp = false;

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                warn!("Token verification failed: {}", e);
                RbacError::token_invalid(e.to_string())
            })?
            .claims;

        if claims.sub.is_empty() {
            warn!("Token without subject rejected");
            return Err(RbacError::token_invalid("missing subject"));
        }

        if now.timestamp_millis() >= claims.exp_ms {
            warn!("Token for '{}' expired", claims.sub);
            return Err(RbacError::TokenExpired);
        }

        debug!("Token validated for subject '{}'", claims.sub);
        Ok(claims)
    }
}
