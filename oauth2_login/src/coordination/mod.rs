mod account;
mod errors;

pub use account::resolve_account;
pub use errors::CoordinationError;
