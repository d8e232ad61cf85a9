use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::auth::{AuthConfig, AuthResult};
use crate::models::Engineer;

/// Claims carried by the session cookie.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionClaims {
    /// GitHub handle of the signed-in engineer.
    pub sub: String,
    /// Engineer row id.
    pub eid: i32,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Issues and verifies HS256 session tokens.
pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl SessionService {
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret_bytes = config.session_secret.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.session_audience.clone()]);
        validation.set_issuer(&[config.session_issuer.clone()]);
        validation.leeway = 30;

        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            validation,
            issuer: config.session_issuer.clone(),
            audience: config.session_audience.clone(),
            ttl: Duration::seconds(config.session_ttl_secs),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Signed token for `engineer`, valid for the configured TTL.
    pub fn issue(&self, engineer: &Engineer) -> AuthResult<String> {
        self.issue_at(engineer.id, &engineer.git_handle, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        engineer_id: i32,
        git_handle: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<String> {
        let expires_at = now + self.ttl;
        let claims = SessionClaims {
            sub: git_handle.to_string(),
            eid: engineer_id,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    pub fn decode(&self, token: &str) -> AuthResult<SessionClaims> {
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;
    use crate::test_support::test_auth_config;

    #[test]
    fn issues_and_decodes_sessions() {
        let service = SessionService::from_config(&test_auth_config());
        let signed = service
            .issue_at(7, "octocat", Utc::now())
            .expect("issue session");

        let claims = service.decode(&signed).expect("decode session");
        assert_eq!(claims.sub, "octocat");
        assert_eq!(claims.eid, 7);
        assert_eq!(claims.aud, "hackdin-test");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_expired_sessions() {
        let service = SessionService::from_config(&test_auth_config());
        let long_ago = Utc::now() - Duration::days(30);
        let signed = service
            .issue_at(7, "octocat", long_ago)
            .expect("issue session");

        assert!(matches!(
            service.decode(&signed),
            Err(AuthError::SessionExpired)
        ));
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let service = SessionService::from_config(&test_auth_config());
        let mut other_config = test_auth_config();
        other_config.session_secret = "another-secret-that-is-long-enough-for-hs256".into();
        let other = SessionService::from_config(&other_config);

        let signed = other.issue_at(1, "mallory", Utc::now()).expect("issue");
        assert!(matches!(
            service.decode(&signed),
            Err(AuthError::SessionInvalid)
        ));
    }
}
