use thiserror::Error;

/// Failures while resolving a console session.
///
/// Every variant reaches clients as the same "invalid session" reply; the
/// variants only exist so logs say where resolution stopped.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Admin client error: {0}")]
    AdminClient(String),

    #[error("Account info request failed: {0}")]
    AccountInfo(String),

    #[error("Policy error: {0}")]
    Policy(#[from] authz::AuthzError),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

impl From<tower_sessions::session::Error> for SessionError {
    fn from(err: tower_sessions::session::Error) -> Self {
        SessionError::Store(err.to_string())
    }
}
