use crate::auth::{AuthError, AuthResult};
use crate::config::{env_bool, env_i64, env_opt, env_string};

/// Authentication configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub github_client_id: String,
    pub github_client_secret: String,
    pub github_callback_url: String,
    pub github_authorize_url: String,
    pub github_token_url: String,
    pub github_api_base: String,
    pub session_secret: String,
    pub session_issuer: String,
    pub session_audience: String,
    pub session_ttl_secs: i64,
    pub session_cookie_name: String,
    pub state_cookie_name: String,
    pub state_ttl_secs: i64,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let github_client_id = required("GITHUB_CLIENT_ID")?;
        let github_client_secret = required("GITHUB_CLIENT_SECRET")?;
        let session_secret = required("HACKDIN_SESSION_SECRET")?;
        if session_secret.len() < 32 {
            return Err(AuthError::Config(
                "HACKDIN_SESSION_SECRET must be at least 32 bytes".into(),
            ));
        }

        Ok(Self {
            github_client_id,
            github_client_secret,
            github_callback_url: env_string(
                "GITHUB_CALLBACK_URL",
                "http://localhost:3000/auth/github/callback",
            ),
            github_authorize_url: env_string(
                "GITHUB_AUTHORIZE_URL",
                "https://github.com/login/oauth/authorize",
            ),
            github_token_url: env_string(
                "GITHUB_TOKEN_URL",
                "https://github.com/login/oauth/access_token",
            ),
            github_api_base: env_string("GITHUB_API_BASE", "https://api.github.com"),
            session_secret,
            session_issuer: env_string("HACKDIN_SESSION_ISSUER", "hackdin"),
            session_audience: env_string("HACKDIN_SESSION_AUDIENCE", "hackdin-web"),
            session_ttl_secs: env_i64("HACKDIN_SESSION_TTL_SECS", 7 * 24 * 60 * 60),
            session_cookie_name: env_string("HACKDIN_SESSION_COOKIE_NAME", "hackdin_session"),
            state_cookie_name: env_string("HACKDIN_STATE_COOKIE_NAME", "hackdin_oauth_state"),
            state_ttl_secs: env_i64("HACKDIN_STATE_TTL_SECS", 10 * 60),
            cookie_domain: env_opt("HACKDIN_COOKIE_DOMAIN"),
            cookie_secure: env_bool("HACKDIN_COOKIE_SECURE", true),
        })
    }
}

fn required(key: &str) -> AuthResult<String> {
    env_opt(key).ok_or_else(|| AuthError::Config(format!("{key} is required")))
}
