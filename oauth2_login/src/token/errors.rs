use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("Token signing error: {0}")]
    Signing(String),

    #[error("Token verification error: {0}")]
    Verification(String),
}
