use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};

use crate::auth::{AuthError, AuthResult, AuthState};

/// The engineer identified by a valid session cookie.
///
/// Handlers that also serve signed-out visitors take `Option<SessionUser>`.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub engineer_id: i32,
    pub git_handle: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match extract_session(request).await {
            Ok(user) => Outcome::Success(user),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

async fn extract_session(request: &Request<'_>) -> AuthResult<SessionUser> {
    let auth_state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))?;

    let cookie = request
        .cookies()
        .get(&auth_state.config.session_cookie_name)
        .ok_or(AuthError::Unauthorized)?;

    let claims = auth_state.sessions.decode(cookie.value())?;

    Ok(SessionUser {
        engineer_id: claims.eid,
        git_handle: claims.sub,
    })
}
