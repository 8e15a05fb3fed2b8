use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::domain::UserId;
use super::service::AuthError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub exp: i64,
}

/// HS256 session tokens carrying the user id.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: UserId) -> Result<String, AuthError> {
        self.issue_expiring(user, Utc::now() + self.ttl)
    }

    pub(crate) fn issue_expiring(
        &self,
        user: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            id: user.0,
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|error| AuthError::Signing(error.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|error| match error.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_decode_to_the_user() {
        let signer = TokenSigner::new("test-secret", 24);
        let token = signer.issue(UserId(7)).expect("signs");
        let claims = signer.decode(&token).expect("decodes");
        assert_eq!(claims.id, 7);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let signer = TokenSigner::new("test-secret", 24);
        let expired = signer
            .issue_expiring(UserId(7), Utc::now() - Duration::hours(2))
            .expect("signs");
        assert!(matches!(signer.decode(&expired), Err(AuthError::Expired)));

        let other = TokenSigner::new("other-secret", 24);
        let foreign = other.issue(UserId(7)).expect("signs");
        assert!(matches!(signer.decode(&foreign), Err(AuthError::InvalidToken)));
        assert!(matches!(signer.decode("not-a-jwt"), Err(AuthError::InvalidToken)));
    }
}
