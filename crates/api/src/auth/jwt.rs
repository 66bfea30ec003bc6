//! Identity token verification

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::middleware::{AuthError, AuthUser};
use crate::config::AuthKey;

/// Claims read from an identity-provider session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity-provider subject id
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Verifies session tokens against a static key
#[derive(Clone)]
pub struct IdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl IdentityVerifier {
    /// HS256 shared secret
    pub fn from_secret(secret: &[u8]) -> Self {
        Self::with_key(DecodingKey::from_secret(secret), Algorithm::HS256)
    }

    /// RS256 public key in PEM format
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, AuthError> {
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|e| AuthError::Internal(format!("Invalid RSA PEM: {}", e)))?;
        Ok(Self::with_key(key, Algorithm::RS256))
    }

    pub fn from_auth_key(key: &AuthKey) -> Result<Self, AuthError> {
        match key {
            AuthKey::RsaPem(pem) => Self::from_rsa_pem(pem.as_bytes()),
            AuthKey::Secret(secret) => Ok(Self::from_secret(secret.as_bytes())),
        }
    }

    fn with_key(decoding_key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        // Session tokens carry `azp` rather than `aud`
        validation.validate_aud = false;
        Self {
            decoding_key,
            validation,
        }
    }

    pub fn set_issuer(&mut self, issuer: &str) {
        self.validation.set_issuer(&[issuer]);
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Token validation failed");
            AuthError::InvalidToken
        })?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(AuthUser {
            identity_id: claims.sub,
            email: claims.email.filter(|e| !e.trim().is_empty()),
        })
    }
}
