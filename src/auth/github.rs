use std::time::Duration;

use reqwest::Url;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;

use crate::auth::{AuthConfig, AuthError, AuthResult};
use crate::store::EngineerDraft;

const OAUTH_SCOPE: &str = "read:user user:email";

/// OAuth web-flow client for GitHub.
pub struct GitHubClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    callback_url: String,
    authorize_url: String,
    token_url: String,
    api_base: String,
}

/// The parts of a GitHub account an engineer profile is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubProfile {
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl GitHubProfile {
    /// Engineer fields for this account; the display name falls back to the login.
    pub fn to_engineer_draft(&self) -> EngineerDraft {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.login)
            .to_string();

        EngineerDraft {
            name,
            git_handle: self.login.clone(),
            email: self.email.clone(),
            image: self.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailEntry {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

impl GitHubClient {
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("hackdin/0.1")
            .build()?;

        Ok(Self {
            http,
            client_id: config.github_client_id.clone(),
            client_secret: config.github_client_secret.clone(),
            callback_url: config.github_callback_url.clone(),
            authorize_url: config.github_authorize_url.clone(),
            token_url: config.github_token_url.clone(),
            api_base: config.github_api_base.trim_end_matches('/').to_string(),
        })
    }

    /// URL the browser is sent to in order to start the login.
    pub fn authorize_url(&self, state: &str) -> AuthResult<String> {
        let url = Url::parse_with_params(
            &self.authorize_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.callback_url.as_str()),
                ("scope", OAUTH_SCOPE),
                ("state", state),
            ],
        )
        .map_err(|err| AuthError::Config(format!("invalid GitHub authorize URL: {err}")))?;

        Ok(url.to_string())
    }

    /// Trade the callback `code` for an access token.
    pub async fn exchange_code(&self, code: &str) -> AuthResult<String> {
        let response = self
            .http
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.callback_url.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::ProviderStatus { status, body });
        }

        let parsed: TokenResponse = response.json().await?;
        match (parsed.access_token, parsed.error) {
            (Some(token), None) if !token.is_empty() => Ok(token),
            (_, Some(error)) => Err(AuthError::Provider(
                parsed.error_description.unwrap_or(error),
            )),
            _ => Err(AuthError::Provider("no access token in response".into())),
        }
    }

    /// Load the signed-in account and its best email address.
    pub async fn fetch_profile(&self, access_token: &str) -> AuthResult<GitHubProfile> {
        let user: UserResponse = self
            .api_get(access_token, "/user")
            .await?
            .json()
            .await?;

        let emails = match self.api_get(access_token, "/user/emails").await {
            Ok(response) => response.json::<Vec<EmailEntry>>().await.unwrap_or_default(),
            Err(err) => {
                log::warn!("github: could not list emails for '{}': {}", user.login, err);
                Vec::new()
            }
        };

        if user.login.trim().is_empty() {
            return Err(AuthError::Profile("GitHub user has no login".into()));
        }

        Ok(GitHubProfile {
            email: pick_email(&emails, user.email.as_deref()),
            login: user.login,
            name: user.name,
            avatar_url: user.avatar_url,
        })
    }

    async fn api_get(&self, access_token: &str, path: &str) -> AuthResult<reqwest::Response> {
        let response = self
            .http
            .get(format!("{}{}", self.api_base, path))
            .header(ACCEPT, "application/vnd.github+json")
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AuthError::ProviderStatus { status, body })
        }
    }
}

/// Primary verified address first, then any listed address, then the public one.
pub fn pick_email(emails: &[EmailEntry], public_email: Option<&str>) -> Option<String> {
    emails
        .iter()
        .find(|entry| entry.primary && entry.verified)
        .or_else(|| emails.first())
        .map(|entry| entry.email.clone())
        .or_else(|| {
            public_email
                .map(str::trim)
                .filter(|email| !email.is_empty())
                .map(str::to_string)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_auth_config;

    fn entry(email: &str, primary: bool, verified: bool) -> EmailEntry {
        EmailEntry {
            email: email.into(),
            primary,
            verified,
        }
    }

    #[test]
    fn authorize_url_carries_client_and_state() {
        let client = GitHubClient::from_config(&test_auth_config()).expect("client");
        let url = client.authorize_url("xyz123").expect("url");
        let parsed = Url::parse(&url).expect("valid url");

        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".into(), "test-client".into())));
        assert!(pairs.contains(&("state".into(), "xyz123".into())));
        assert!(pairs.contains(&("scope".into(), OAUTH_SCOPE.into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "http://localhost:3000/auth/github/callback".into()
        )));
    }

    #[test]
    fn prefers_primary_verified_email() {
        let emails = vec![
            entry("old@example.com", false, true),
            entry("main@example.com", true, true),
        ];
        assert_eq!(
            pick_email(&emails, Some("public@example.com")),
            Some("main@example.com".into())
        );
    }

    #[test]
    fn falls_back_to_first_then_public_email() {
        let emails = vec![entry("first@example.com", true, false)];
        assert_eq!(pick_email(&emails, None), Some("first@example.com".into()));
        assert_eq!(
            pick_email(&[], Some(" public@example.com ")),
            Some("public@example.com".into())
        );
        assert_eq!(pick_email(&[], None), None);
    }

    #[test]
    fn draft_uses_login_when_name_missing() {
        let profile = GitHubProfile {
            login: "octocat".into(),
            name: Some("  ".into()),
            email: None,
            avatar_url: Some("https://avatars.githubusercontent.com/u/583231".into()),
        };
        let draft = profile.to_engineer_draft();
        assert_eq!(draft.name, "octocat");
        assert_eq!(draft.git_handle, "octocat");
        assert_eq!(
            draft.image.as_deref(),
            Some("https://avatars.githubusercontent.com/u/583231")
        );
    }
}
