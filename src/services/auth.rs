use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by the hosted auth provider's bearer token. Session
/// issuance lives outside this service; we only verify.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Professional account id.
    pub sub: Uuid,
    /// Display name shown to clients.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub exp: i64,
}

/// HS256 verification keys shared with the auth provider.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a bearer token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Issue a token for the given claims. Used by tests and tooling; the
    /// production issuer is the hosted auth provider.
    pub fn issue(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding).map_err(|_| AuthError::InvalidToken)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid or expired bearer token")]
    InvalidToken,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn claims_expiring_in(minutes: i64) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            name: "Marc Dubois".to_string(),
            avatar_url: Some("https://cdn.example/avatar.png".to_string()),
            exp: (Utc::now() + Duration::minutes(minutes)).timestamp(),
        }
    }

    #[test]
    fn issue_then_verify_round_trips_claims() {
        let keys = JwtKeys::new("test-secret");
        let claims = claims_expiring_in(30);

        let token = keys.issue(&claims).unwrap();
        let verified = keys.verify(&token).unwrap();

        assert_eq!(verified.sub, claims.sub);
        assert_eq!(verified.name, "Marc Dubois");
        assert_eq!(verified.avatar_url, claims.avatar_url);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = JwtKeys::new("test-secret");
        let token = keys.issue(&claims_expiring_in(-10)).unwrap();
        assert_eq!(keys.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let keys = JwtKeys::new("test-secret");
        let other = JwtKeys::new("other-secret");
        let token = other.issue(&claims_expiring_in(30)).unwrap();
        assert_eq!(keys.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let keys = JwtKeys::new("test-secret");
        assert_eq!(keys.verify("not-a-jwt"), Err(AuthError::InvalidToken));
    }
}
