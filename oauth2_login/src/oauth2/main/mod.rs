mod core;
mod github;
mod google;

pub use core::OAuth2Flow;
