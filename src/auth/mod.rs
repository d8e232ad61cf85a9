//! Authentication: GitHub OAuth sign-in, signed session cookies, the
//! request guard that reads them, and the sign-in/out route handlers.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod github;
pub mod guards;
pub mod routes;
pub mod session;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use github::{GitHubClient, GitHubProfile};
pub use guards::SessionUser;
pub use session::SessionService;

#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub github: Arc<GitHubClient>,
    pub sessions: Arc<SessionService>,
}

impl AuthState {
    pub fn new(config: AuthConfig) -> AuthResult<Self> {
        let github = GitHubClient::from_config(&config)?;
        let sessions = SessionService::from_config(&config);
        Ok(Self {
            config,
            github: Arc::new(github),
            sessions: Arc::new(sessions),
        })
    }
}
