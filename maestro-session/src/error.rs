//! Error types for maestro-session — Railway Programming
//!
//! All fallible operations return `Result<T, AuthError>`.
//! Nothing here is fatal: the worst outcome of any error is a forced
//! transition to the unauthenticated state.

use thiserror::Error;

/// Message shown to end users when the identity service gives none
pub const DEFAULT_FAILURE_MESSAGE: &str = "Unable to sign in. Please try again.";

/// Unified error type for all session operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ─── Identity Service Errors ───

    #[error("Identity service unreachable: {0}")]
    Transport(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ─── Session Errors ───

    #[error("Request superseded by a later session change")]
    Superseded,

    #[error("Malformed persisted data: {0}")]
    MalformedPersistedData(String),

    #[error("Token invalid: {0}")]
    TokenInvalid(String),

    // ─── Infrastructure Errors ───

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Actor unavailable: {0}")]
    ActorUnavailable(String),
}

impl AuthError {
    /// Text suitable for display to the end user.
    ///
    /// Identity service messages pass through verbatim; everything else
    /// collapses to `fallback` so internals never leak into the UI.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Rejected(msg) | Self::Transport(msg) | Self::InvalidInput(msg)
                if !msg.trim().is_empty() =>
            {
                msg.clone()
            }
            _ => fallback.to_string(),
        }
    }

    /// Whether the failure came from the identity service round trip
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Rejected(_))
    }
}

impl From<std::io::Error> for AuthError {
    fn from(err: std::io::Error) -> Self {
        AuthError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Serialization(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::TokenInvalid(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Transport(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<url::ParseError> for AuthError {
    fn from(err: url::ParseError) -> Self {
        AuthError::Config(format!("URL parse error: {err}"))
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_passes_remote_text() {
        let err = AuthError::Rejected("Email or password is incorrect".into());
        assert_eq!(err.user_message(DEFAULT_FAILURE_MESSAGE), "Email or password is incorrect");
        assert_eq!(err.to_string(), "Email or password is incorrect");
    }

    #[test]
    fn test_user_message_falls_back() {
        let blank = AuthError::Rejected("  ".into());
        assert_eq!(blank.user_message(DEFAULT_FAILURE_MESSAGE), DEFAULT_FAILURE_MESSAGE);

        let internal = AuthError::Storage("disk full".into());
        assert_eq!(internal.user_message("nope"), "nope");
    }
}
