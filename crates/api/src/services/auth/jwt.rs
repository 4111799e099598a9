//! HS256 bearer tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use freshcart_core::{UserId, UserRole};

use super::AuthError;
use crate::config::AuthConfig;
use crate::models::User;

/// Claims carried by a FreshCart bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID, as a decimal string.
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    /// Issued at (Unix timestamp seconds).
    pub iat: i64,
    /// Expiration (Unix timestamp seconds).
    pub exp: i64,
}

impl Claims {
    /// The user this token was issued to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if `sub` is not a user ID.
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            expiry: Duration::hours(config.jwt_expiry_hours),
        }
    }

    /// Issue a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::TokenSigning)
    }

    /// Verify a token's signature and expiry and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for any malformed, tampered or expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {e}");
                AuthError::InvalidToken
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use freshcart_core::Email;

    fn user() -> User {
        User {
            id: UserId::new(42),
            email: Email::parse("shopper@example.com").unwrap(),
            first_name: "Sam".to_string(),
            last_name: "Shopper".to_string(),
            phone: None,
            address: None,
            role: UserRole::Admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = JwtKeys::new(&test_config().auth);
        let token = keys.issue(&user()).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), UserId::new(42));
        assert_eq!(claims.email, "shopper@example.com");
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let keys = JwtKeys::new(&test_config().auth);
        let mut token = keys.issue(&user()).unwrap();
        token.push('x');
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut config = test_config().auth;
        config.jwt_expiry_hours = -1;
        let keys = JwtKeys::new(&config);
        let token = keys.issue(&user()).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_other_secret_rejected() {
        let keys = JwtKeys::new(&test_config().auth);
        let token = keys.issue(&user()).unwrap();

        let mut other = test_config().auth;
        other.jwt_secret = secrecy::SecretString::from("Zx8!pQ3@wE6#rT1$yU5%iO9^aS2&dF7*");
        assert!(JwtKeys::new(&other).verify(&token).is_err());
    }
}
