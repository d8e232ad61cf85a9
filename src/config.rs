//! Environment-driven configuration helpers and the static client settings.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

pub fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

pub fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(default)
}

pub fn env_duration_secs(key: &str, default_secs: u64) -> Duration {
    Duration::from_secs(env_u64(key, default_secs))
}

pub fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Non-empty value of `key`, if set.
pub fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Location of the browser client's HTML pages and assets.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_dir: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            client_dir: PathBuf::from(env_string("HACKDIN_CLIENT_DIR", "./client")),
        }
    }

    pub fn page(&self, file_name: &str) -> PathBuf {
        self.client_dir.join(file_name)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variables_fall_back_to_defaults() {
        assert!(env_bool("HACKDIN_TEST_UNSET_BOOL", true));
        assert_eq!(env_u64("HACKDIN_TEST_UNSET_U64", 42), 42);
        assert_eq!(env_string("HACKDIN_TEST_UNSET_STRING", "fallback"), "fallback");
        assert_eq!(env_opt("HACKDIN_TEST_UNSET_OPT"), None);
    }

    #[test]
    fn client_pages_resolve_under_client_dir() {
        let config = ClientConfig {
            client_dir: PathBuf::from("/srv/client"),
        };
        assert_eq!(config.page("index.html"), PathBuf::from("/srv/client/index.html"));
    }
}
