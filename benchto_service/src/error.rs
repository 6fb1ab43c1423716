use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    /// The requested transition is not allowed from the entity's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The backing store failed.
    #[error("repository error: {0}")]
    Repo(String),
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
