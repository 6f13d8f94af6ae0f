//! HS256 bearer tokens.
//!
//! The token carries everything the access rules need (id, superuser flag,
//! roles), so resolving a principal never touches the store.

use chrono::{Duration, Utc};
use domains::{IdentityError, IdentityProvider, Principal, PrincipalId};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("jwt secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    #[serde(default)]
    pub superuser: bool,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Principal {
            id: PrincipalId(claims.sub),
            username: claims.username,
            is_superuser: claims.superuser,
            roles: claims.roles.into_iter().collect(),
        }
    }
}

pub struct JwtIdentity {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
}

impl JwtIdentity {
    pub fn new(secret: &SecretString, issuer: impl Into<String>, ttl_secs: u64) -> Result<Self, TokenError> {
        let raw = secret.expose_secret().as_bytes();
        if raw.len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }
        let issuer = issuer.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(raw),
            decoding: DecodingKey::from_secret(raw),
            validation,
            issuer,
            ttl: Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX / 2)),
        })
    }

    /// Signs a token for `principal`, valid for the configured lifetime.
    pub fn issue(&self, principal: &Principal) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.id.0,
            username: principal.username.clone(),
            superuser: principal.is_superuser,
            roles: principal.roles.iter().cloned().collect(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }
}

impl IdentityProvider for JwtIdentity {
    fn authenticate(&self, credential: &str) -> Result<Principal, IdentityError> {
        let token = credential.trim();
        if token.is_empty() {
            return Err(IdentityError::Missing);
        }
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => IdentityError::Expired,
            _ => {
                tracing::debug!(error = %e, "rejected bearer token");
                IdentityError::Invalid(e.to_string())
            }
        })?;
        Ok(data.claims.into())
    }
}
