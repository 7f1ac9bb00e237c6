use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{models::UserId, Error, Result};

/// Application session claims (dashboard login)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    pub fn user_id(&self) -> UserId {
        UserId::from_string(self.sub.clone())
    }
}

/// Signs and verifies application session JWTs (HS256).
///
/// These authenticate dashboard users against this API. They are unrelated
/// to the media access tokens minted for the video service.
#[derive(Clone)]
pub struct SessionTokenService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    token_duration: Duration,
}

impl std::fmt::Debug for SessionTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenService")
            .field("token_duration", &self.token_duration)
            .finish()
    }
}

impl SessionTokenService {
    pub fn new(secret: &str, token_duration_hours: i64) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Config("JWT secret must not be empty".to_string()));
        }

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            token_duration: Duration::hours(token_duration_hours),
        })
    }

    /// Sign a session token for a user
    pub fn sign(&self, user_id: &UserId) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_duration).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign session token: {e}")))
    }

    /// Verify a session token and extract claims
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 60;

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Error::Authentication("Token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    Error::Authentication("Invalid token signature".to_string())
                }
                _ => Error::Authentication("Invalid token".to_string()),
            }
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let svc = SessionTokenService::new("test-secret", 24).unwrap();
        let user_id = UserId::new();

        let token = svc.sign(&user_id).unwrap();
        let claims = svc.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id.as_str());
        assert_eq!(claims.user_id(), user_id);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let svc1 = SessionTokenService::new("secret-a", 24).unwrap();
        let svc2 = SessionTokenService::new("secret-b", 24).unwrap();

        let token = svc1.sign(&UserId::new()).unwrap();
        assert!(svc2.verify(&token).is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(SessionTokenService::new("", 24).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let svc = SessionTokenService::new("test-secret", 24).unwrap();
        assert!(svc.verify("not.a.jwt").is_err());
    }
}
