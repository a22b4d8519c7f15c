use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use oauth2_login::{CoordinationError, OAuth2Error};

/// HTTP mapping for login flow failures.
///
/// Clients get the status and a short message; the detail behind
/// provider and storage failures is logged, never returned. Headers the
/// flow produced before failing, such as the Set-Cookie consuming an
/// already-validated state, ride along on the error response.
pub struct AuthError {
    error: CoordinationError,
    headers: HeaderMap,
}

impl AuthError {
    pub fn with_headers(error: CoordinationError, headers: HeaderMap) -> Self {
        Self { error, headers }
    }
}

impl From<CoordinationError> for AuthError {
    fn from(error: CoordinationError) -> Self {
        Self {
            error,
            headers: HeaderMap::new(),
        }
    }
}

impl From<OAuth2Error> for AuthError {
    fn from(err: OAuth2Error) -> Self {
        Self::from(CoordinationError::from(err))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.error {
            CoordinationError::OAuth2(err) => match err {
                OAuth2Error::UnknownProvider(_) => {
                    (StatusCode::FORBIDDEN, "Unknown authentication provider")
                }
                OAuth2Error::NotConfigured(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Authentication provider is not configured",
                ),
                OAuth2Error::InvalidState => (StatusCode::FORBIDDEN, "Invalid OAuth state"),
                OAuth2Error::TokenExchange(_) => {
                    (StatusCode::FORBIDDEN, "Authorization code was rejected")
                }
                OAuth2Error::NoEmailAvailable => (
                    StatusCode::FORBIDDEN,
                    "No email address available from provider",
                ),
                OAuth2Error::ProviderHttp(_) => (
                    StatusCode::BAD_GATEWAY,
                    "Authentication provider is unavailable",
                ),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed"),
            },
            CoordinationError::EmailConflict => (
                StatusCode::FORBIDDEN,
                "Email already in use by a linked account",
            ),
            CoordinationError::UsernameExhausted => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not allocate a unique username",
            ),
            CoordinationError::Token(_) | CoordinationError::User(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed")
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self.error, %status, "login failed");
        } else {
            tracing::debug!(error = %self.error, %status, "login rejected");
        }

        let mut response = (status, message).into_response();
        response.headers_mut().extend(self.headers);
        response
    }
}
