mod errors;
mod issuer;
mod types;

pub use errors::TokenError;
pub use issuer::TokenIssuer;
pub use types::{Claims, TokenPair, TokenUse};
