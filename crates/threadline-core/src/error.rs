/// Errors from store and thread-builder operations.
///
/// `NotFound` and `InvalidArgument` are caller errors: they are returned
/// before anything is written. `Conflict` means an identifier could not be
/// allocated. `Integrity` means stored data violates the forest invariant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced article or comment does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A required field is blank or a reference is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Identifier already taken, or generation exhausted its retries.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Comment parent links do not form a forest.
    #[error("data integrity violation: {0}")]
    Integrity(String),

    /// Failure in the underlying storage backend.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl Error {
    pub fn article_not_found(id: &str) -> Error {
        Error::NotFound(format!("article {}", id))
    }

    pub fn comment_not_found(id: &str) -> Error {
        Error::NotFound(format!("comment {}", id))
    }

    /// True for errors caused by the caller's input rather than the server.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::InvalidArgument(_))
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
