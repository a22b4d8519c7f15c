use thiserror::Error;

use crate::utils::UtilError;

use super::types::Provider;

#[derive(Debug, Error, Clone)]
pub enum OAuth2Error {
    #[error("Unknown OAuth2 provider: {0}")]
    UnknownProvider(String),

    #[error("OAuth2 provider {0} is not configured")]
    NotConfigured(Provider),

    /// Deliberately carries no detail about which check failed.
    #[error("Invalid OAuth state")]
    InvalidState,

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Provider request failed: {0}")]
    ProviderHttp(String),

    #[error("No email address available from provider")]
    NoEmailAvailable,

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serde error: {0}")]
    Serde(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}
