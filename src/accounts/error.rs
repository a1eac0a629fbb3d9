use thiserror::Error;

/// Errors surfaced by an `AccountStore`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An account with this normalized email already exists
    #[error("Account with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Account {0} not found")]
    NotFound(String),

    /// Backing store failure with no viable fallback
    #[error("Account store failure: {0}")]
    Backend(String),
}
