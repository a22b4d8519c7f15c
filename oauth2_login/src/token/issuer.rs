use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::userdb::User;

use super::errors::TokenError;
use super::types::{Claims, TokenPair, TokenUse};

/// Signs the application's own access/refresh pair after a login and
/// verifies access tokens presented back to it. HS256 with a shared key.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl: i64, refresh_ttl: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issue a fresh pair for `user`. Both tokens share the subject but
    /// carry distinct ids and lifetimes.
    pub fn issue(&self, user: &User) -> Result<TokenPair, TokenError> {
        let access_token = self.sign(&user.id, TokenUse::Access, self.access_ttl)?;
        let refresh_token = self.sign(&user.id, TokenUse::Refresh, self.refresh_ttl)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.access_ttl,
        })
    }

    /// Verify signature, expiry, and that the token is the access half of
    /// a pair. A refresh token is rejected here by its `token_use` claim.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| TokenError::Verification(e.to_string()))?;
        if data.claims.token_use != TokenUse::Access {
            return Err(TokenError::Verification(
                "not an access token".to_string(),
            ));
        }
        Ok(data.claims)
    }

    fn sign(&self, sub: &str, token_use: TokenUse, ttl: i64) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now,
            exp: now + ttl,
            jti: Uuid::new_v4().to_string(),
            token_use,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_user() -> User {
        User {
            id: "user-1".to_string(),
            username: "jane".to_string(),
            email: "jane@example.com".to_string(),
            password_hash: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("0123456789abcdef0123456789abcdef", 900, 3600)
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let pair = issuer.issue(&test_user()).unwrap();

        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.expires_in, 900);

        let claims = issuer.verify_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.token_use, TokenUse::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let issuer = issuer();
        let pair = issuer.issue(&test_user()).unwrap();

        let err = issuer.verify_access_token(&pair.refresh_token).unwrap_err();
        assert!(matches!(err, TokenError::Verification(_)));
    }

    #[test]
    fn test_verification_requires_matching_key() {
        let pair = issuer().issue(&test_user()).unwrap();

        let other = TokenIssuer::new("another-secret-another-secret!!!", 900, 3600);
        assert!(other.verify_access_token(&pair.access_token).is_err());
    }

    #[test]
    fn test_token_ids_are_unique() {
        let issuer = issuer();
        let pair = issuer.issue(&test_user()).unwrap();
        let a = issuer.verify_access_token(&pair.access_token).unwrap();

        let again = issuer.issue(&test_user()).unwrap();
        let b = issuer.verify_access_token(&again.access_token).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::new("0123456789abcdef0123456789abcdef", -120, 3600);
        let pair = issuer.issue(&test_user()).unwrap();
        assert!(issuer.verify_access_token(&pair.access_token).is_err());
    }
}
