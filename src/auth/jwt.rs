use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::Duration;
use tracing::debug;

use super::claims::{Claims, TokenPurpose};
use crate::{clock::Clock, config::JwtConfig};

/// Lifetime of verification and password-reset tokens.
pub const PURPOSE_TOKEN_TTL: Duration = Duration::hours(1);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("malformed token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),
}

/// Issues and checks signed tokens. Built once from config and shared through `AppState`.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(cfg: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            access_ttl: Duration::minutes(cfg.ttl_minutes),
            clock,
        }
    }

    pub fn issue(
        &self,
        subject: &str,
        purpose: Option<TokenPurpose>,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        let now = self.clock.now();
        let claims = Claims {
            sub: Some(subject.to_string()),
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
            purpose,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(purpose = ?purpose, "jwt signed");
        Ok(token)
    }

    pub fn issue_access(&self, subject: &str) -> anyhow::Result<String> {
        self.issue(subject, None, self.access_ttl)
    }

    pub fn issue_purpose(&self, subject: &str, purpose: TokenPurpose) -> anyhow::Result<String> {
        self.issue(subject, Some(purpose), PURPOSE_TOKEN_TTL)
    }

    /// Checks signature and expiry. A token is expired once `now >= exp`.
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // expiry is judged against the injected clock below
        validation.validate_exp = false;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if self.clock.now().unix_timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        debug!(purpose = ?data.claims.purpose, "jwt verified");
        Ok(data.claims)
    }
}
