use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Reconcile error: {0}")]
    Reconcile(String),
}

/// Short alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn reconcile(msg: impl Into<String>) -> Self {
        Self::Reconcile(msg.into())
    }
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// True when the object this error refers to no longer exists, whether
    /// the store reported it directly or the API server answered 404.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Kube(kube::Error::Api(e)) => e.code == 404,
            _ => false,
        }
    }

    /// True for optimistic-concurrency failures (stale resourceVersion).
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::Kube(kube::Error::Api(e)) => e.code == 409,
            _ => false,
        }
    }
}
