use std::env;

use thiserror::Error;

use crate::oauth2::{Provider, ProviderConfig};

/// Default lifetime of the CSRF state, in seconds.
const DEFAULT_STATE_MAX_AGE: i64 = 600;
/// Default access token lifetime, in seconds.
const DEFAULT_ACCESS_TOKEN_TTL: i64 = 900;
/// Default refresh token lifetime, in seconds.
const DEFAULT_REFRESH_TOKEN_TTL: i64 = 60 * 60 * 24 * 30;

/// Secrets shorter than this are refused at startup.
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnv(String, String),
}

/// Process-wide authentication settings, loaded once at startup and
/// handed to the flow as a plain value. Nothing in the request path
/// reads the environment.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Public origin of this deployment, e.g. `https://app.example.com`.
    pub origin: String,
    /// Path prefix the auth routes are mounted under, e.g. `/oauth2`.
    pub route_prefix: String,
    /// Key for the HMAC that seals the state cookie.
    pub state_secret: String,
    /// Key for signing issued JWTs.
    pub jwt_secret: String,
    /// Seconds a CSRF state stays valid.
    pub state_max_age: i64,
    /// Seconds an access token stays valid.
    pub access_token_ttl: i64,
    /// Seconds a refresh token stays valid.
    pub refresh_token_ttl: i64,
    pub github: ProviderConfig,
    pub google: ProviderConfig,
}

impl AuthConfig {
    /// Load the configuration from the environment.
    ///
    /// `ORIGIN`, `AUTH_STATE_SECRET` and `AUTH_JWT_SECRET` are required.
    /// Provider credentials are optional; a provider missing either half
    /// of its credentials is loaded as unconfigured and rejects logins.
    pub fn from_env() -> Result<Self, ConfigError> {
        let origin = require_env("ORIGIN")?;
        let origin = origin.trim_end_matches('/').to_string();

        let route_prefix =
            env::var("AUTH_ROUTE_PREFIX").unwrap_or_else(|_| "/oauth2".to_string());
        if !route_prefix.starts_with('/') {
            return Err(ConfigError::InvalidEnv(
                "AUTH_ROUTE_PREFIX".to_string(),
                "must start with '/'".to_string(),
            ));
        }
        let route_prefix = route_prefix.trim_end_matches('/').to_string();

        let state_secret = require_secret("AUTH_STATE_SECRET")?;
        let jwt_secret = require_secret("AUTH_JWT_SECRET")?;

        Ok(Self {
            origin,
            route_prefix,
            state_secret,
            jwt_secret,
            state_max_age: env_i64("AUTH_STATE_MAX_AGE", DEFAULT_STATE_MAX_AGE)?,
            access_token_ttl: env_i64("AUTH_ACCESS_TOKEN_TTL", DEFAULT_ACCESS_TOKEN_TTL)?,
            refresh_token_ttl: env_i64("AUTH_REFRESH_TOKEN_TTL", DEFAULT_REFRESH_TOKEN_TTL)?,
            github: provider_from_env(Provider::GitHub),
            google: provider_from_env(Provider::Google),
        })
    }

    pub fn provider(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::GitHub => &self.github,
            Provider::Google => &self.google,
        }
    }

    /// The redirect URI registered with the provider:
    /// `{origin}{route_prefix}/{provider}/callback`.
    pub fn callback_uri(&self, provider: Provider) -> String {
        format!("{}{}/{provider}/callback", self.origin, self.route_prefix)
    }
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_string()))
}

fn require_secret(name: &str) -> Result<String, ConfigError> {
    let value = require_env(name)?;
    if value.len() < MIN_SECRET_LEN {
        return Err(ConfigError::InvalidEnv(
            name.to_string(),
            format!("must be at least {MIN_SECRET_LEN} bytes"),
        ));
    }
    Ok(value)
}

fn env_i64(name: &str, default: i64) -> Result<i64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidEnv(name.to_string(), format!("not a number: {raw}"))),
        Err(_) => Ok(default),
    }
}

/// Build one provider's config from `OAUTH2_{PROVIDER}_CLIENT_ID` and
/// `OAUTH2_{PROVIDER}_CLIENT_SECRET`, with optional endpoint overrides
/// (`_AUTH_URL`, `_TOKEN_URL`, `_USERINFO_URL`) for pointing the flow at
/// a stand-in provider.
fn provider_from_env(provider: Provider) -> ProviderConfig {
    let upper = provider.as_str().to_uppercase();
    let var = |suffix: &str| env::var(format!("OAUTH2_{upper}_{suffix}")).ok();

    let mut config = match provider {
        Provider::GitHub => ProviderConfig::github(var("CLIENT_ID"), var("CLIENT_SECRET")),
        Provider::Google => ProviderConfig::google(var("CLIENT_ID"), var("CLIENT_SECRET")),
    };
    if let Some(url) = var("AUTH_URL") {
        config.auth_url = url;
    }
    if let Some(url) = var("TOKEN_URL") {
        config.token_url = url;
    }
    if let Some(url) = var("USERINFO_URL") {
        config.userinfo_url = url;
    }
    config
}
