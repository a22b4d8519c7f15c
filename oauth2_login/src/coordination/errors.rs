use thiserror::Error;

use crate::oauth2::OAuth2Error;
use crate::token::TokenError;
use crate::userdb::UserError;

#[derive(Debug, Clone, Error)]
pub enum CoordinationError {
    #[error(transparent)]
    OAuth2(#[from] OAuth2Error),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    User(#[from] UserError),

    /// The identity's email already belongs to an account that holds a
    /// provider link. Merging is a deliberate user action, never implied
    /// by an email collision.
    #[error("Email already in use by a linked account")]
    EmailConflict,

    /// Every username candidate collided.
    #[error("Could not allocate a unique username")]
    UsernameExhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_sync_send() {
        fn assert_sync_send<T: Sync + Send>() {}
        assert_sync_send::<CoordinationError>();
    }

    #[test]
    fn test_wrapped_errors_keep_their_display() {
        let err = CoordinationError::from(OAuth2Error::InvalidState);
        assert_eq!(err.to_string(), "Invalid OAuth state");
    }
}
