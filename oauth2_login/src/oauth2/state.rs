use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::utils::{base64url_decode, base64url_encode, gen_random_string};

use super::errors::OAuth2Error;
use super::types::{OAuthState, Provider};

type HmacSha256 = Hmac<Sha256>;

/// The "__Host-" prefix makes the cookie host-only.
pub const STATE_COOKIE_NAME: &str = "__Host-OAuthState";

/// 32 bytes of entropy; base64url-encoded this is a 43-character token.
const STATE_TOKEN_BYTES: usize = 32;

/// Issues and validates the single-use CSRF state carried through the
/// provider redirect.
///
/// The client session cookie IS the store: `seal` produces a
/// tamper-evident cookie value, `open` authenticates it, and the caller
/// clears the cookie together with a successful `validate` so a replayed
/// callback fails here rather than later in the flow.
#[derive(Clone)]
pub struct StateStore {
    secret: Vec<u8>,
    max_age: Duration,
}

impl StateStore {
    pub fn new(secret: &str, max_age_secs: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            max_age: Duration::seconds(max_age_secs),
        }
    }

    /// Create a fresh state bound to `provider`.
    pub fn issue(&self, provider: Provider) -> Result<OAuthState, OAuth2Error> {
        let token = gen_random_string(STATE_TOKEN_BYTES)?;
        Ok(OAuthState {
            token,
            provider,
            created_at: Utc::now(),
        })
    }

    /// Serialize a state into the signed cookie value:
    /// `base64url(json) "." base64url(hmac-sha256)`.
    pub fn seal(&self, state: &OAuthState) -> Result<String, OAuth2Error> {
        let payload = serde_json::to_vec(state).map_err(|e| OAuth2Error::Serde(e.to_string()))?;
        let payload = base64url_encode(&payload);
        let tag = self.mac(payload.as_bytes())?;
        Ok(format!("{payload}.{}", base64url_encode(&tag)))
    }

    /// Parse and authenticate a previously sealed cookie value.
    pub fn open(&self, value: &str) -> Result<OAuthState, OAuth2Error> {
        let (payload, tag) = value.split_once('.').ok_or(OAuth2Error::InvalidState)?;
        let presented = base64url_decode(tag).map_err(|_| OAuth2Error::InvalidState)?;
        let expected = self.mac(payload.as_bytes())?;
        if !bool::from(expected.as_slice().ct_eq(presented.as_slice())) {
            tracing::debug!("state cookie failed authentication");
            return Err(OAuth2Error::InvalidState);
        }
        let payload = base64url_decode(payload).map_err(|_| OAuth2Error::InvalidState)?;
        serde_json::from_slice(&payload).map_err(|_| OAuth2Error::InvalidState)
    }

    /// Check the presented callback parameters against the session state.
    ///
    /// Every failure collapses into `InvalidState`: missing session state,
    /// token mismatch, a state minted for another provider, or an expired
    /// state. Callers must clear the session cookie on success; that clear
    /// is what makes the state single-use.
    pub fn validate(
        &self,
        session_state: Option<&OAuthState>,
        presented_token: &str,
        presented_provider: Provider,
    ) -> Result<(), OAuth2Error> {
        let state = session_state.ok_or(OAuth2Error::InvalidState)?;

        let token_matches = bool::from(
            state
                .token
                .as_bytes()
                .ct_eq(presented_token.as_bytes()),
        );
        if !token_matches {
            tracing::debug!("state token mismatch");
            return Err(OAuth2Error::InvalidState);
        }

        if state.provider != presented_provider {
            tracing::debug!("state bound to a different provider");
            return Err(OAuth2Error::InvalidState);
        }

        if Utc::now() - state.created_at > self.max_age {
            tracing::debug!("state expired");
            return Err(OAuth2Error::InvalidState);
        }

        Ok(())
    }

    fn mac(&self, data: &[u8]) -> Result<Vec<u8>, OAuth2Error> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| OAuth2Error::Crypto(e.to_string()))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
