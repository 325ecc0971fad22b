//! Explicit user session context.
//!
//! A [`Session`] names the signed-in user for the duration of one command
//! or request. Operations that touch per-user data take it as an argument.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("user id must not be empty")]
    EmptyUserId,
}

/// The authenticated user for a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: String,
}

impl Session {
    /// Start a session for `user_id`. Surrounding whitespace is trimmed.
    pub fn start(user_id: impl Into<String>) -> Result<Self, SessionError> {
        let user_id = user_id.into().trim().to_string();
        if user_id.is_empty() {
            return Err(SessionError::EmptyUserId);
        }
        Ok(Self { user_id })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}
