use thiserror::Error;

/// Error taxonomy for the table store.
///
/// Validation and not-found conditions are client errors and are surfaced
/// verbatim; store errors come from the transport collaborator and are
/// propagated without retry.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No record with id={id} in table '{table}'")]
    NotFound { table: String, id: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
}

impl Error {
    /// Validation error with a formatted message
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Missing-record error for update/delete targets
    pub fn not_found(table: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            table: table.into(),
            id: id.into(),
        }
    }

    /// Transport failure, propagated unmodified
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
