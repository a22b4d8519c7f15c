use reqwest::Client;
use serde::Deserialize;

use super::super::errors::OAuth2Error;
use super::super::types::{OAuthUserInfo, Provider, ProviderConfig, email_local_part};

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: String,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    #[serde(default)]
    verified_email: bool,
}

/// Fetch and normalize the Google identity from the userinfo endpoint.
/// Google supplies no handle, so the username is derived from the email
/// local part.
pub(super) async fn fetch_identity(
    client: &Client,
    config: &ProviderConfig,
    access_token: &str,
) -> Result<OAuthUserInfo, OAuth2Error> {
    let response = client
        .get(&config.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| OAuth2Error::ProviderHttp(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!(%status, "Google userinfo request failed");
        return Err(OAuth2Error::ProviderHttp(format!(
            "Google returned {status}"
        )));
    }

    let user: GoogleUserInfo = response
        .json()
        .await
        .map_err(|e| OAuth2Error::ProviderHttp(format!("Failed to parse Google response: {e}")))?;

    let username = email_local_part(&user.email).to_string();

    Ok(OAuthUserInfo {
        provider: Provider::Google,
        oauth_id: user.id,
        email: user.email,
        first_name: user.given_name,
        last_name: user.family_name,
        username,
        email_verified: user.verified_email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_google_user_info_deserialization() {
        let user: GoogleUserInfo = serde_json::from_value(json!({
            "id": "123456789",
            "email": "jane.doe@example.com",
            "verified_email": true,
            "given_name": "Jane",
            "family_name": "Doe",
            "picture": "https://example.com/pic.jpg",
        }))
        .unwrap();

        assert_eq!(user.id, "123456789");
        assert_eq!(user.email, "jane.doe@example.com");
        assert!(user.verified_email);
    }

    #[test]
    fn test_google_user_info_defaults_missing_names() {
        let user: GoogleUserInfo = serde_json::from_value(json!({
            "id": "1",
            "email": "jane.doe@example.com",
        }))
        .unwrap();

        assert_eq!(user.given_name, "");
        assert_eq!(user.family_name, "");
        assert!(!user.verified_email);
    }

    #[test]
    fn test_username_derived_from_email_local_part() {
        assert_eq!(email_local_part("jane.doe@example.com"), "jane.doe");
        assert_eq!(email_local_part("no-at-sign"), "no-at-sign");
    }
}
