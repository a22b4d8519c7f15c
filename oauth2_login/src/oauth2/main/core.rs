use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use url::Url;

use crate::config::AuthConfig;
use crate::coordination::{CoordinationError, resolve_account};
use crate::token::{TokenIssuer, TokenPair};
use crate::userdb::UserStore;
use crate::utils::header_set_cookie;

use super::super::errors::OAuth2Error;
use super::super::state::{STATE_COOKIE_NAME, StateStore};
use super::super::types::{
    AuthCallback, OAuthUserInfo, Provider, ProviderConfig, RawTokenResponse,
};
use super::{github, google};

/// The flow must never hang on a provider that stops responding.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Drives the authorization-initiation and callback state machine.
///
/// Each login attempt is request-scoped; the only shared pieces are the
/// immutable configuration, the HTTP client, and the external user store.
pub struct OAuth2Flow {
    config: AuthConfig,
    state_store: StateStore,
    issuer: TokenIssuer,
    store: Arc<dyn UserStore>,
    client: reqwest::Client,
}

impl OAuth2Flow {
    pub fn new(config: AuthConfig, store: Arc<dyn UserStore>) -> Result<Self, OAuth2Error> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| OAuth2Error::Internal(e.to_string()))?;
        let state_store = StateStore::new(&config.state_secret, config.state_max_age);
        let issuer = TokenIssuer::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        );
        Ok(Self {
            config,
            state_store,
            issuer,
            store,
            client,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Start a login: issue a CSRF state, stash it in the session cookie
    /// headers, and return the provider authorization URL to redirect to.
    pub fn prepare_auth_request(
        &self,
        provider_name: &str,
    ) -> Result<(String, HeaderMap), OAuth2Error> {
        let provider: Provider = provider_name.parse()?;
        let config = self.config.provider(provider);

        let state = self.state_store.issue(provider)?;
        let auth_url =
            build_authorization_url(config, &self.config.callback_uri(provider), &state.token)?;

        let sealed = self.state_store.seal(&state)?;
        let mut headers = HeaderMap::new();
        header_set_cookie(&mut headers, STATE_COOKIE_NAME, &sealed, self.config.state_max_age)?;

        tracing::debug!(%provider, "prepared authorization redirect");
        Ok((auth_url, headers))
    }

    /// Complete a login from the provider callback.
    ///
    /// Transitions in strict order: state validation, code exchange,
    /// identity fetch, account resolution, credential issuing. Any failure
    /// is terminal for the request. The returned headers belong on the
    /// response whether the flow succeeded or not: once validation has
    /// passed they carry the clearing cookie that consumes the state.
    pub async fn complete_authorization(
        &self,
        provider_name: &str,
        callback: &AuthCallback,
        state_cookie: Option<&str>,
    ) -> (HeaderMap, Result<TokenPair, CoordinationError>) {
        let mut headers = HeaderMap::new();
        let result = self
            .run_callback(provider_name, callback, state_cookie, &mut headers)
            .await;
        (headers, result)
    }

    async fn run_callback(
        &self,
        provider_name: &str,
        callback: &AuthCallback,
        state_cookie: Option<&str>,
        headers: &mut HeaderMap,
    ) -> Result<TokenPair, CoordinationError> {
        let provider: Provider = provider_name.parse().map_err(CoordinationError::from)?;
        let config = self.config.provider(provider);

        let session_state = state_cookie.and_then(|value| self.state_store.open(value).ok());
        self.state_store
            .validate(session_state.as_ref(), &callback.state, provider)?;

        // The state is consumed here. The clearing cookie goes out with
        // this response even when a later transition fails, so the same
        // state never validates twice.
        header_set_cookie(headers, STATE_COOKIE_NAME, "", 0).map_err(OAuth2Error::from)?;

        let redirect_uri = self.config.callback_uri(provider);
        let access_token = self.exchange_code(config, &callback.code, &redirect_uri).await?;
        let info = self.fetch_identity(config, &access_token).await?;

        let user = resolve_account(self.store.as_ref(), &info).await?;
        let tokens = self.issuer.issue(&user)?;

        tracing::info!(%provider, user_id = %user.id, "login completed");
        Ok(tokens)
    }

    /// Exchange the authorization code at the provider token endpoint.
    /// Credentials are checked before any network call goes out.
    async fn exchange_code(
        &self,
        config: &ProviderConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<String, OAuth2Error> {
        let (client_id, client_secret) = config.credentials()?;

        let response = self
            .client
            .post(&config.token_url)
            .header(http::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| OAuth2Error::ProviderHttp(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(provider = %config.provider, %status, "token endpoint returned an error");
            return Err(OAuth2Error::ProviderHttp(format!(
                "token endpoint returned {status}"
            )));
        }

        let body: RawTokenResponse = response
            .json()
            .await
            .map_err(|e| OAuth2Error::TokenExchange(e.to_string()))?;

        body.access_token.ok_or_else(|| {
            tracing::error!(provider = %config.provider, "token response carried no access_token");
            OAuth2Error::TokenExchange("no access_token in provider response".to_string())
        })
    }

    async fn fetch_identity(
        &self,
        config: &ProviderConfig,
        access_token: &str,
    ) -> Result<OAuthUserInfo, OAuth2Error> {
        match config.provider {
            Provider::GitHub => github::fetch_identity(&self.client, config, access_token).await,
            Provider::Google => google::fetch_identity(&self.client, config, access_token).await,
        }
    }
}

/// Build the provider authorization URL with the standard query set.
pub(crate) fn build_authorization_url(
    config: &ProviderConfig,
    redirect_uri: &str,
    state: &str,
) -> Result<String, OAuth2Error> {
    let client_id = config.client_id()?;
    let url = Url::parse_with_params(
        &config.auth_url,
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", &config.scope),
            ("state", state),
        ],
    )
    .map_err(|e| OAuth2Error::Internal(format!("invalid authorization URL: {e}")))?;
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn query_params(url: &str) -> HashMap<String, String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_build_authorization_url_contains_required_params() {
        let config = ProviderConfig::github(
            Some("client-id".to_string()),
            Some("client-secret".to_string()),
        );
        let url = build_authorization_url(
            &config,
            "https://app.example.com/oauth2/github/callback",
            "state-token",
        )
        .unwrap();

        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        let params = query_params(&url);
        assert_eq!(params["client_id"], "client-id");
        assert_eq!(
            params["redirect_uri"],
            "https://app.example.com/oauth2/github/callback"
        );
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "read:user user:email");
        assert_eq!(params["state"], "state-token");
    }

    #[test]
    fn test_build_authorization_url_google() {
        let config = ProviderConfig::google(Some("gid".to_string()), Some("gsecret".to_string()));
        let url =
            build_authorization_url(&config, "https://app.example.com/cb", "s").unwrap();

        let params = query_params(&url);
        assert_eq!(params["scope"], "openid email profile");
        assert_eq!(params["response_type"], "code");
    }

    #[test]
    fn test_build_authorization_url_requires_client_id() {
        let config = ProviderConfig::github(None, Some("secret".to_string()));
        let result = build_authorization_url(&config, "https://app.example.com/cb", "s");
        assert!(matches!(
            result,
            Err(OAuth2Error::NotConfigured(Provider::GitHub))
        ));
    }
}
