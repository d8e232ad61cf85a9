//! GitHub sign-in, callback and sign-out handlers.

use base64::Engine;
use rand::RngCore;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::response::Redirect;
use rocket::{State, get};
use rocket_db_pools::sqlx;
use time::Duration as TimeDuration;

use crate::auth::guards::SessionUser;
use crate::auth::{AuthError, AuthResult, AuthState};
use crate::error::ApiError;
use crate::models::Engineer;
use crate::store::find_or_create_engineer;

const STATE_COOKIE_PATH: &str = "/auth";

/// Start the GitHub login.
#[get("/signin")]
pub fn signin(state: &State<AuthState>, cookies: &CookieJar<'_>) -> Result<Redirect, ApiError> {
    begin_login(state, cookies)
}

/// New accounts are created on first login, so sign-up is the same flow.
#[get("/signup")]
pub fn signup(state: &State<AuthState>, cookies: &CookieJar<'_>) -> Result<Redirect, ApiError> {
    begin_login(state, cookies)
}

/// GitHub redirects here after the user approves (or denies) the login.
///
/// Any failure is logged and the visitor is sent back to the home page
/// without a session.
#[get("/auth/github/callback?<code>&<state>&<error>")]
pub async fn github_callback(
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    auth: &State<AuthState>,
    pool: &State<sqlx::PgPool>,
    cookies: &CookieJar<'_>,
) -> Redirect {
    let expected_state = cookies
        .get(&auth.config.state_cookie_name)
        .map(|cookie| cookie.value().to_string());
    remove_cookie(cookies, auth, &auth.config.state_cookie_name, STATE_COOKIE_PATH);

    let result = match error {
        Some(error) => Err(AuthError::Provider(error)),
        None => {
            complete_login(
                auth,
                pool,
                code.as_deref(),
                state.as_deref(),
                expected_state.as_deref(),
            )
            .await
        }
    };

    match result.and_then(|engineer| start_session(auth, cookies, &engineer).map(|_| engineer)) {
        Ok(engineer) => log::info!("signed in '{}'", engineer.git_handle),
        Err(err) => log::warn!("github login failed: {}", err),
    }

    Redirect::to("/")
}

/// End the session.
#[get("/signout")]
pub fn signout(
    auth: &State<AuthState>,
    cookies: &CookieJar<'_>,
    user: Option<SessionUser>,
) -> Redirect {
    match user {
        Some(user) => log::info!("signing out '{}'", user.git_handle),
        None => log::debug!("signout without an active session"),
    }
    remove_cookie(cookies, auth, &auth.config.session_cookie_name, "/");
    Redirect::to("/")
}

fn begin_login(state: &State<AuthState>, cookies: &CookieJar<'_>) -> Result<Redirect, ApiError> {
    let oauth_state = generate_state_token();
    let authorize_url = state
        .github
        .authorize_url(&oauth_state)
        .map_err(|err| ApiError::InternalError(err.to_string()))?;

    let mut cookie = Cookie::build((state.config.state_cookie_name.clone(), oauth_state))
        .path(STATE_COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.cookie_secure)
        .max_age(TimeDuration::seconds(state.config.state_ttl_secs))
        .build();

    if let Some(domain) = &state.config.cookie_domain {
        cookie.set_domain(domain.clone());
    }

    cookies.add(cookie);

    Ok(Redirect::to(authorize_url))
}

/// Check the OAuth state, exchange the code and fetch-or-create the engineer.
async fn complete_login(
    auth: &AuthState,
    pool: &sqlx::PgPool,
    code: Option<&str>,
    state: Option<&str>,
    expected_state: Option<&str>,
) -> AuthResult<Engineer> {
    verify_state(state, expected_state)?;
    let code = code
        .filter(|code| !code.is_empty())
        .ok_or(AuthError::CodeMissing)?;

    let access_token = auth.github.exchange_code(code).await?;
    let profile = auth.github.fetch_profile(&access_token).await?;

    let created = find_or_create_engineer(pool, &profile.to_engineer_draft()).await?;
    if created.is_new() {
        log::info!("registered engineer '{}' from GitHub", profile.login);
    }
    Ok(created.into_inner())
}

fn verify_state(received: Option<&str>, expected: Option<&str>) -> AuthResult<()> {
    let expected = expected.ok_or(AuthError::StateMissing)?;
    let received = received.ok_or(AuthError::StateMissing)?;
    if expected.is_empty() || received != expected {
        return Err(AuthError::StateMismatch);
    }
    Ok(())
}

/// Set the session cookie for `engineer`.
pub fn start_session(
    auth: &AuthState,
    cookies: &CookieJar<'_>,
    engineer: &Engineer,
) -> AuthResult<()> {
    let token = auth.sessions.issue(engineer)?;

    let mut cookie = Cookie::build((auth.config.session_cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(auth.config.cookie_secure)
        .max_age(TimeDuration::seconds(auth.sessions.ttl().num_seconds()))
        .build();

    if let Some(domain) = &auth.config.cookie_domain {
        cookie.set_domain(domain.clone());
    }

    cookies.add(cookie);
    Ok(())
}

fn remove_cookie(cookies: &CookieJar<'_>, auth: &AuthState, name: &str, path: &'static str) {
    let mut cookie = Cookie::build((name.to_string(), String::new()))
        .path(path)
        .removal()
        .build();

    if let Some(domain) = &auth.config.cookie_domain {
        cookie.set_domain(domain.clone());
    }
    cookies.add(cookie);
}

fn generate_state_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_must_match_cookie() {
        assert!(verify_state(Some("abc"), Some("abc")).is_ok());
        assert!(matches!(
            verify_state(Some("abc"), Some("abd")),
            Err(AuthError::StateMismatch)
        ));
        assert!(matches!(
            verify_state(None, Some("abc")),
            Err(AuthError::StateMissing)
        ));
        assert!(matches!(
            verify_state(Some("abc"), None),
            Err(AuthError::StateMissing)
        ));
    }

    #[test]
    fn state_tokens_are_random_and_url_safe() {
        let first = generate_state_token();
        let second = generate_state_token();
        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
