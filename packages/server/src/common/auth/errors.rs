use thiserror::Error;

/// Operator authentication failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Unsupported authorization scheme")]
    UnsupportedScheme,

    #[error("Malformed credentials")]
    MalformedCredentials,

    #[error("Invalid operator token")]
    InvalidToken,
}
