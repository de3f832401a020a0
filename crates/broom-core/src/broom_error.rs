use thiserror::Error;

use crate::platform::PlatformError;

/// Message shown to the user in place of any technical failure detail.
pub const TECHNICAL_ERROR_MESSAGE: &str = "Error when deleting posts";

#[derive(Debug, Error)]
/// Outcome kinds that stop a command before or instead of a deletion.
///
/// `User` and `PermissionDenied` carry the text shown to the invoking user and are not
/// faults. `Technical` keeps the collaborator failure for the server log only.
pub enum BroomError {
    #[error("{0}")]
    User(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("technical error: {0}")]
    Technical(#[from] PlatformError),
}

pub type BroomResult<T> = Result<T, BroomError>;

impl BroomError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    pub fn is_technical(&self) -> bool {
        matches!(self, Self::Technical(_))
    }

    /// Text safe to show the invoking user.
    pub fn user_message(&self) -> String {
        match self {
            Self::User(message) | Self::PermissionDenied(message) => message.clone(),
            Self::Technical(_) => TECHNICAL_ERROR_MESSAGE.to_string(),
        }
    }
}
