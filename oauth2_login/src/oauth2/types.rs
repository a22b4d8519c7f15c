use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::OAuth2Error;

const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USERINFO_URL: &str = "https://api.github.com/user";
const GITHUB_SCOPE: &str = "read:user user:email";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const GOOGLE_SCOPE: &str = "openid email profile";

/// The closed set of supported login providers.
///
/// Provider names arrive as untrusted path segments; parsing through
/// `FromStr` is the only way in, so arbitrary names cannot reach the
/// callback handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    GitHub,
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = OAuth2Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(Self::GitHub),
            "google" => Ok(Self::Google),
            other => Err(OAuth2Error::UnknownProvider(other.to_string())),
        }
    }
}

/// Static per-provider configuration, loaded once at startup and passed
/// explicitly into the flow. A provider without both credentials is
/// considered unconfigured and every operation on it fails fast.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scope: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl ProviderConfig {
    pub fn github(client_id: Option<String>, client_secret: Option<String>) -> Self {
        Self {
            provider: Provider::GitHub,
            auth_url: GITHUB_AUTH_URL.to_string(),
            token_url: GITHUB_TOKEN_URL.to_string(),
            userinfo_url: GITHUB_USERINFO_URL.to_string(),
            scope: GITHUB_SCOPE.to_string(),
            client_id,
            client_secret,
        }
    }

    pub fn google(client_id: Option<String>, client_secret: Option<String>) -> Self {
        Self {
            provider: Provider::Google,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            scope: GOOGLE_SCOPE.to_string(),
            client_id,
            client_secret,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    pub(crate) fn client_id(&self) -> Result<&str, OAuth2Error> {
        self.client_id
            .as_deref()
            .ok_or(OAuth2Error::NotConfigured(self.provider))
    }

    pub(crate) fn credentials(&self) -> Result<(&str, &str), OAuth2Error> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(OAuth2Error::NotConfigured(self.provider)),
        }
    }
}

/// Ephemeral CSRF artifact round-tripped through the provider redirect.
///
/// Lives only in the client session cookie; the server keeps no copy, so
/// concurrent instances and restarts need no shared state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    pub token: String,
    pub provider: Provider,
    pub created_at: DateTime<Utc>,
}

/// Normalized identity returned by a provider after code exchange.
/// Constructed per callback, never persisted verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthUserInfo {
    pub provider: Provider,
    pub oauth_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email_verified: bool,
}

impl OAuthUserInfo {
    /// Username candidate for account creation: the provider-suggested
    /// handle, falling back to the email local part when empty.
    pub fn username_candidate(&self) -> String {
        if self.username.is_empty() {
            email_local_part(&self.email).to_string()
        } else {
            self.username.clone()
        }
    }
}

pub(crate) fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Query parameters the provider appends to the callback redirect.
#[derive(Debug, Deserialize)]
pub struct AuthCallback {
    pub code: String,
    pub state: String,
}

/// Token endpoint response body. `access_token` stays optional because
/// GitHub answers 200 with an error payload for a bad code; its absence
/// is what signals a failed exchange.
#[derive(Debug, Deserialize)]
pub(crate) struct RawTokenResponse {
    pub(crate) access_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("github".parse::<Provider>().unwrap(), Provider::GitHub);
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Google);

        let err = "gitlab".parse::<Provider>().unwrap_err();
        assert!(matches!(err, OAuth2Error::UnknownProvider(name) if name == "gitlab"));
    }

    #[test]
    fn test_provider_rejects_case_variants() {
        // Path segments are matched exactly; "GitHub" is not a valid provider name.
        assert!("GitHub".parse::<Provider>().is_err());
        assert!("GOOGLE".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_serde_uses_lowercase() {
        assert_eq!(serde_json::to_value(Provider::GitHub).unwrap(), json!("github"));
        assert_eq!(serde_json::to_value(Provider::Google).unwrap(), json!("google"));
    }

    #[test]
    fn test_unconfigured_provider_fails_fast() {
        let config = ProviderConfig::github(Some("id".to_string()), None);
        assert!(!config.is_configured());
        assert!(config.client_id().is_ok());
        assert!(matches!(
            config.credentials(),
            Err(OAuth2Error::NotConfigured(Provider::GitHub))
        ));
    }

    #[test]
    fn test_username_candidate_falls_back_to_email_local_part() {
        let info = OAuthUserInfo {
            provider: Provider::Google,
            oauth_id: "1".to_string(),
            email: "jane.doe@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            username: String::new(),
            email_verified: true,
        };
        assert_eq!(info.username_candidate(), "jane.doe");

        let info = OAuthUserInfo {
            username: "janed".to_string(),
            ..info
        };
        assert_eq!(info.username_candidate(), "janed");
    }

    #[test]
    fn test_raw_token_response_tolerates_missing_access_token() {
        let body: RawTokenResponse =
            serde_json::from_value(json!({"error": "bad_verification_code"})).unwrap();
        assert!(body.access_token.is_none());

        let body: RawTokenResponse =
            serde_json::from_value(json!({"access_token": "t", "token_type": "bearer"})).unwrap();
        assert_eq!(body.access_token.as_deref(), Some("t"));
    }
}
