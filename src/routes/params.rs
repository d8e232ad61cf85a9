//! Query parameter types shared by route handlers.

use rocket_okapi::okapi::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Query string of `GET /engineer`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, rocket::form::FromForm)]
pub struct EngineerQuery {
    /// GitHub handle to look up (case-insensitive).
    #[field(name = "gitHandle")]
    #[serde(rename = "gitHandle", default)]
    pub git_handle: Option<String>,
}

impl EngineerQuery {
    /// The trimmed handle, or a 400 when it is missing or blank.
    pub fn handle(&self) -> Result<&str, ApiError> {
        self.git_handle
            .as_deref()
            .map(str::trim)
            .filter(|handle| !handle.is_empty())
            .ok_or_else(|| ApiError::BadRequest("gitHandle query parameter is required".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_trimmed() {
        let query = EngineerQuery {
            git_handle: Some("  octocat ".into()),
        };
        assert_eq!(query.handle().expect("present"), "octocat");
    }

    #[test]
    fn blank_handle_is_bad_request() {
        for git_handle in [None, Some("   ".to_string())] {
            let query = EngineerQuery { git_handle };
            assert!(matches!(query.handle(), Err(ApiError::BadRequest(_))));
        }
    }
}
