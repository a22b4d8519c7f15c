use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum UserError {
    #[error("Storage error: {0}")]
    Storage(String),

    /// A unique index rejected the write. The payload names the violated
    /// constraint, e.g. `users.username`.
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("User not found: {0}")]
    NotFound(String),
}

impl UserError {
    /// True when the violation was the username index specifically, which
    /// account creation handles by retrying with a new suffix.
    pub fn is_username_conflict(&self) -> bool {
        matches!(self, Self::UniqueViolation(constraint) if constraint.contains("username"))
    }
}
