// src/auth.rs
use crate::error::ApiError;
use bcrypt::DEFAULT_COST;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{Filter, Rejection};

const TOKEN_VALIDITY_HOURS: i64 = 24;

/// The acting user, as established by a verified token or a login.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub username: String,
}

#[derive(Serialize, Deserialize)]
struct Claims {
    id: String,
    username: String,
    exp: usize,
}

/// The one capability the request guard needs: turn a bearer token into
/// the identity it vouches for, or nothing.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Option<Identity>;
}

/// HMAC-signed JWTs with a process-wide shared secret.
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    pub fn new(secret: String) -> Self {
        JwtVerifier { secret }
    }

    pub fn create_token(&self, user: &Identity) -> Result<String, ApiError> {
        let expiration = (Utc::now() + Duration::hours(TOKEN_VALIDITY_HOURS)).timestamp();
        let claims = Claims {
            id: user.id.clone(),
            username: user.username.clone(),
            exp: expiration as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| {
            error!("Failed to sign token: {}", e);
            ApiError::Database(e.to_string())
        })
    }
}

impl CredentialVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Option<Identity> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .ok()?;
        Some(Identity {
            id: data.claims.id,
            username: data.claims.username,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, DEFAULT_COST).map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::Database(e.to_string())
    })
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Guards protected routes: any request without a valid bearer token is
/// rejected with 401 before a handler runs.
pub fn with_auth(
    verifier: Arc<dyn CredentialVerifier>,
) -> impl Filter<Extract = (Identity,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::any().map(move || verifier.clone()))
        .and_then(authenticate)
}

async fn authenticate(
    header: Option<String>,
    verifier: Arc<dyn CredentialVerifier>,
) -> Result<Identity, Rejection> {
    let header = header.ok_or_else(|| warp::reject::custom(ApiError::Unauthorized))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| warp::reject::custom(ApiError::Unauthorized))?;
    verifier
        .verify(token)
        .ok_or_else(|| warp::reject::custom(ApiError::Unauthorized))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            id: "3f2b9d6e".to_string(),
            username: "alice".to_string(),
        }
    }

    #[test]
    fn token_round_trip() {
        let verifier = JwtVerifier::new("test-secret".to_string());
        let token = verifier.create_token(&identity()).unwrap();
        let verified = verifier.verify(&token).unwrap();
        assert_eq!(verified.id, "3f2b9d6e");
        assert_eq!(verified.username, "alice");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let verifier = JwtVerifier::new("test-secret".to_string());
        let other = JwtVerifier::new("other-secret".to_string());
        let token = verifier.create_token(&identity()).unwrap();
        assert!(other.verify(&token).is_none());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let verifier = JwtVerifier::new("test-secret".to_string());
        assert!(verifier.verify("not-a-token").is_none());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[tokio::test]
    async fn missing_bearer_prefix_is_unauthorized() {
        let verifier: Arc<dyn CredentialVerifier> =
            Arc::new(JwtVerifier::new("test-secret".to_string()));
        let filter = with_auth(verifier);
        let result = warp::test::request()
            .header("authorization", "Token abc")
            .filter(&filter)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let verifier: Arc<dyn CredentialVerifier> =
            Arc::new(JwtVerifier::new("test-secret".to_string()));
        let filter = with_auth(verifier);
        let result = warp::test::request().filter(&filter).await;
        assert!(result.is_err());
    }
}
