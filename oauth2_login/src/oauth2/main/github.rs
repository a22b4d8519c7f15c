use reqwest::Client;
use serde::Deserialize;

use super::super::errors::OAuth2Error;
use super::super::types::{OAuthUserInfo, Provider, ProviderConfig};

/// GitHub requires a User-Agent on every API request.
const USER_AGENT: &str = "oauth2-login";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    #[serde(default)]
    verified: bool,
}

/// Fetch and normalize the GitHub identity: GET `/user` for the profile,
/// then GET `/user/emails` for the primary address.
pub(super) async fn fetch_identity(
    client: &Client,
    config: &ProviderConfig,
    access_token: &str,
) -> Result<OAuthUserInfo, OAuth2Error> {
    let user: GitHubUser = get_json(client, &config.userinfo_url, access_token).await?;
    let emails_url = format!("{}/emails", config.userinfo_url);
    let emails: Vec<GitHubEmail> = get_json(client, &emails_url, access_token).await?;

    let email = select_primary_email(&emails).ok_or(OAuth2Error::NoEmailAvailable)?;
    let (first_name, last_name) = split_name(user.name.as_deref().unwrap_or_default());

    Ok(OAuthUserInfo {
        provider: Provider::GitHub,
        oauth_id: user.id.to_string(),
        email: email.email.clone(),
        email_verified: email.verified,
        first_name,
        last_name,
        username: user.login,
    })
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    access_token: &str,
) -> Result<T, OAuth2Error> {
    let response = client
        .get(url)
        .bearer_auth(access_token)
        .header(http::header::USER_AGENT, USER_AGENT)
        .header(http::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| OAuth2Error::ProviderHttp(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!(%url, %status, "GitHub API request failed");
        return Err(OAuth2Error::ProviderHttp(format!(
            "GitHub returned {status}"
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| OAuth2Error::ProviderHttp(format!("Failed to parse GitHub response: {e}")))
}

fn select_primary_email(emails: &[GitHubEmail]) -> Option<&GitHubEmail> {
    emails.iter().find(|e| e.primary).or_else(|| emails.first())
}

/// Split a display name on the first space; a single-word name yields an
/// empty last name, everything after the first space stays in the last name.
fn split_name(name: &str) -> (String, String) {
    match name.trim().split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}
