use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::auth::{Principal, Role};
use crate::domain::errors::DomainError;
use crate::domain::ports::{PasswordHasher, TokenIssuer};

pub const BCRYPT_COST: u32 = 10;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    email: String,
    role: Role,
    exp: i64,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Keys {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    fn issue(&self, principal: &Principal) -> Result<String, DomainError> {
        let claims = Claims {
            sub: principal.user_id,
            email: principal.email.clone(),
            role: principal.role,
            exp: Utc::now().timestamp() + self.ttl.as_secs() as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| DomainError::Internal(format!("failed to sign token: {e}")))
    }

    fn verify(&self, token: &str) -> Result<Principal, DomainError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                log::debug!("Rejected token: {}", e);
                DomainError::Unauthorized("Invalid or expired token".to_string())
            })?;
        Ok(Principal {
            user_id: data.claims.sub,
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}

/// HS256 tokens; access and password-reset tokens use separate secrets so
/// neither can stand in for the other.
pub struct JwtTokens {
    access: Keys,
    reset: Keys,
}

impl JwtTokens {
    pub fn new(
        access_secret: &str,
        access_ttl: Duration,
        reset_secret: &str,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            access: Keys::new(access_secret, access_ttl),
            reset: Keys::new(reset_secret, reset_ttl),
        }
    }
}

impl TokenIssuer for JwtTokens {
    fn issue_access(&self, principal: &Principal) -> Result<String, DomainError> {
        self.access.issue(principal)
    }

    fn verify_access(&self, token: &str) -> Result<Principal, DomainError> {
        self.access.verify(token)
    }

    fn issue_reset(&self, principal: &Principal) -> Result<String, DomainError> {
        self.reset.issue(principal)
    }

    fn verify_reset(&self, token: &str) -> Result<Principal, DomainError> {
        self.reset.verify(token)
    }
}

pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(BCRYPT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, secret: &str) -> Result<String, DomainError> {
        bcrypt::hash(secret, self.cost).map_err(|e| DomainError::Internal(e.to_string()))
    }

    fn verify(&self, secret: &str, hash: &str) -> Result<bool, DomainError> {
        bcrypt::verify(secret, hash).map_err(|e| DomainError::Internal(e.to_string()))
    }
}
