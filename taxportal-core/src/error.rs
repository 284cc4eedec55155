//! Error types surfaced to portal callers

use thiserror::Error;

/// Errors raised by the authentication stub
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    InvalidCode(String),

    #[error("Unknown or expired verification challenge")]
    UnknownChallenge,

    #[error("Not logged in. Run `taxportal login` first.")]
    NotLoggedIn,
}

/// Errors that can occur during portal operations
#[derive(Error, Debug)]
pub enum PortalError {
    /// A form failed validation; the message is meant for the user as-is
    #[error("{0}")]
    Validation(String),

    /// One or more file candidates were rejected; reasons joined with ", "
    #[error("{0}")]
    Attachments(String),

    #[error("Tax return not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        PortalError::Validation(message.into())
    }

    /// True for errors the user can fix by editing the form and retrying
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, PortalError::Storage(_))
    }
}

pub type PortalResult<T> = std::result::Result<T, PortalError>;
