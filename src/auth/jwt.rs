use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::auth::{AuthConfig, AuthError, AuthResult};
use crate::models::Role;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AccessTokenClaims {
    /// Login name (`name_user`) of the subject.
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub role: String,
    pub user_id: i32,
}

#[derive(Debug, Clone)]
pub struct SignedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_token_ttl: Duration,
}

impl JwtService {
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        let secret_bytes = config.jwt_secret.as_bytes();
        let encoding_key = EncodingKey::from_secret(secret_bytes);
        let decoding_key = DecodingKey::from_secret(secret_bytes);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.audience.clone()]);
        validation.set_issuer(&[config.issuer.clone()]);
        validation.leeway = 30;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_token_ttl: Duration::seconds(config.access_token_ttl_secs),
        })
    }

    pub fn issue_access_token(
        &self,
        name_user: &str,
        role: Role,
        user_id: i32,
    ) -> AuthResult<SignedAccessToken> {
        let now = Utc::now();
        let expires_at = now + self.access_token_ttl;

        let claims = AccessTokenClaims {
            sub: name_user.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            role: role.as_str().to_string(),
            user_id,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(SignedAccessToken { token, expires_at })
    }

    /// Verify signature, issuer, audience, and expiry. Expiry failures are
    /// distinguished so callers can report `ExpiredToken` vs `InvalidToken`.
    pub fn decode_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        match decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation) {
            Ok(token_data) => Ok(token_data.claims),
            Err(err) if matches!(err.kind(), ErrorKind::ExpiredSignature) => {
                Err(AuthError::TokenExpired)
            }
            Err(_) => Err(AuthError::TokenInvalid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_JWT_SECRET: &str = "super-secret-test-key";

    fn make_test_config(ttl_secs: i64) -> AuthConfig {
        AuthConfig {
            issuer: "https://academia.test".into(),
            audience: "academia-api".into(),
            access_token_ttl_secs: ttl_secs,
            jwt_secret: TEST_JWT_SECRET.into(),
        }
    }

    #[test]
    fn issues_and_decodes_access_tokens() {
        let service = JwtService::from_config(&make_test_config(1800)).expect("jwt service");

        let token = service
            .issue_access_token("ana", Role::Student, 42)
            .expect("issue token");

        let claims = service
            .decode_access_token(&token.token)
            .expect("decode token");

        assert_eq!(claims.sub, "ana");
        assert_eq!(claims.role, "student");
        assert_eq!(claims.user_id, 42);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_tokens_are_reported_as_expired() {
        // TTL far enough in the past to clear the 30s validation leeway.
        let service = JwtService::from_config(&make_test_config(-120)).expect("jwt service");
        let token = service
            .issue_access_token("prof", Role::Professor, 1)
            .expect("issue token");

        let err = service
            .decode_access_token(&token.token)
            .expect_err("token should be expired");
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn tampered_tokens_are_invalid() {
        let service = JwtService::from_config(&make_test_config(1800)).expect("jwt service");
        let token = service
            .issue_access_token("admin", Role::Admin, 1)
            .expect("issue token");

        let mut tampered = token.token.clone();
        tampered.push('x');

        let err = service
            .decode_access_token(&tampered)
            .expect_err("tampered token must fail");
        assert!(matches!(err, AuthError::TokenInvalid));

        let err = service
            .decode_access_token("not-a-token")
            .expect_err("garbage must fail");
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let service = JwtService::from_config(&make_test_config(1800)).expect("jwt service");
        let other = JwtService::from_config(&AuthConfig {
            jwt_secret: "a-different-secret".into(),
            ..make_test_config(1800)
        })
        .expect("jwt service");

        let token = other
            .issue_access_token("ana", Role::Student, 42)
            .expect("issue token");

        let err = service
            .decode_access_token(&token.token)
            .expect_err("foreign signature must fail");
        assert!(matches!(err, AuthError::TokenInvalid));
    }
}
