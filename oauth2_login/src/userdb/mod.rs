mod errors;
mod storage;
mod store;
mod types;

pub use errors::UserError;
pub use storage::{MemoryUserStore, SqliteUserStore};
pub use store::UserStore;
pub use types::{AccountLink, User};
