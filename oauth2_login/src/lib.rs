//! Social login against GitHub and Google via the OAuth2 Authorization
//! Code flow, bridging provider identities into a local account model and
//! issuing the application's own signed token pair.
//!
//! The crate is framework-agnostic; `oauth2_login_axum` provides the HTTP
//! surface.

mod config;
mod coordination;
mod oauth2;
mod token;
mod userdb;
mod utils;

pub use config::{AuthConfig, ConfigError};
pub use coordination::{CoordinationError, resolve_account};
pub use oauth2::{
    AuthCallback, OAuth2Error, OAuth2Flow, OAuthState, OAuthUserInfo, Provider, ProviderConfig,
    STATE_COOKIE_NAME, StateStore,
};
pub use token::{Claims, TokenError, TokenIssuer, TokenPair, TokenUse};
pub use userdb::{AccountLink, MemoryUserStore, SqliteUserStore, User, UserError, UserStore};
pub use utils::UtilError;
