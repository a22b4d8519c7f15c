//! Axum bindings for `oauth2-login`: a drop-in router for the social
//! login endpoints and the HTTP mapping of flow errors.

mod error;
mod oauth2;

pub use error::AuthError;
pub use oauth2::oauth2_router;
