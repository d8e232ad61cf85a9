use rocket::http::Status;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("oauth state missing")]
    StateMissing,
    #[error("oauth state mismatch")]
    StateMismatch,
    #[error("authorization code missing")]
    CodeMissing,
    #[error("github denied the request: {0}")]
    Provider(String),
    #[error("github returned status {status}: {body}")]
    ProviderStatus { status: reqwest::StatusCode, body: String },
    #[error("session expired")]
    SessionExpired,
    #[error("session invalid")]
    SessionInvalid,
    #[error("unauthorized")]
    Unauthorized,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("database error: {0}")]
    Sqlx(#[from] rocket_db_pools::sqlx::Error),
    #[error("invalid profile: {0}")]
    Profile(String),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::StateMissing | AuthError::CodeMissing => Status::BadRequest,
            AuthError::StateMismatch
            | AuthError::SessionExpired
            | AuthError::SessionInvalid
            | AuthError::Unauthorized => Status::Unauthorized,
            AuthError::Provider(_) | AuthError::ProviderStatus { .. } | AuthError::Http(_) => {
                Status::BadGateway
            }
            AuthError::Profile(_) => Status::UnprocessableEntity,
            AuthError::Config(_) | AuthError::Sqlx(_) => Status::InternalServerError,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::SessionExpired,
            _ => AuthError::SessionInvalid,
        }
    }
}
