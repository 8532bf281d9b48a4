use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,

    #[error("Token issued for a different scope")]
    WrongScope,

    #[error("Token encoding failed: {0}")]
    Encoding(jsonwebtoken::errors::Error),
}

/// The two parallel bearer-token schemes. Each has its own secret and
/// expiry; a user token never opens an admin route and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub scope: TokenScope,
    pub iat: i64,
    pub exp: i64,
}

/// Issues a signed HS256 bearer token
pub fn issue_token(
    secret: &str,
    scope: TokenScope,
    user_id: Uuid,
    ttl_hours: i64,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        scope,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Encoding)
}

/// Validates a bearer token against the secret for the expected scope
pub fn verify_token(
    secret: &str,
    expected_scope: TokenScope,
    token: &str,
) -> Result<Claims, TokenError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })?;

    let claims = token_data.claims;

    if claims.scope != expected_scope {
        return Err(TokenError::WrongScope);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = issue_token("user-secret", TokenScope::User, user_id, 24).unwrap();

        let claims = verify_token("user-secret", TokenScope::User, &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.scope, TokenScope::User);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token("user-secret", TokenScope::User, Uuid::new_v4(), 24).unwrap();

        let result = verify_token("other-secret", TokenScope::User, &token);
        assert!(matches!(result, Err(TokenError::Invalid)));
    }

    #[test]
    fn test_user_token_rejected_on_admin_scope() {
        // Same secret, wrong scope: still rejected
        let token = issue_token("shared", TokenScope::User, Uuid::new_v4(), 24).unwrap();

        let result = verify_token("shared", TokenScope::Admin, &token);
        assert!(matches!(result, Err(TokenError::WrongScope)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token("user-secret", TokenScope::User, Uuid::new_v4(), -1).unwrap();

        let result = verify_token("user-secret", TokenScope::User, &token);
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn test_garbage_rejected() {
        let result = verify_token("user-secret", TokenScope::User, "not-a-jwt");
        assert!(matches!(result, Err(TokenError::Invalid)));
    }
}
