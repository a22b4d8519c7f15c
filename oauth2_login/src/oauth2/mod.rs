mod errors;
mod main;
mod state;
mod types;

pub use errors::OAuth2Error;
pub use main::OAuth2Flow;
pub use state::{STATE_COOKIE_NAME, StateStore};
pub use types::{AuthCallback, OAuthState, OAuthUserInfo, Provider, ProviderConfig};
