//! Error types for pools and the registry

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Template identity is empty - cannot derive a pool key")]
    MissingIdentity,

    #[error("No pool is registered under key `{key}`")]
    NoSuchPool { key: String },

    #[error("A pool is already registered under key `{key}`")]
    PoolExists { key: String },

    #[error("Pool `{key}` holds a different instance type than requested")]
    TypeMismatch { key: String },

    #[error("Pool `{key}` has no instance at index {index}")]
    UnknownInstance { key: String, index: usize },

    #[error("Metrics export failed: {0}")]
    Metrics(String),
}

pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(feature = "prometheus")]
impl From<prometheus::Error> for PoolError {
    fn from(err: prometheus::Error) -> Self {
        PoolError::Metrics(err.to_string())
    }
}
