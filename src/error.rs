//! Error types for the forex ledger.

use crate::models::ValidationError;

/// All errors that can occur when using the ledger, its storage, or the
/// offline resource cache.
#[derive(Debug, thiserror::Error)]
pub enum ForexError {
    /// User input failed a business rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Durable storage backend failed.
    #[error("storage error: {0}")]
    Storage(Box<dyn core::error::Error + Send + Sync>),

    /// The payload does not fit into the store's quota.
    #[error("storage quota exceeded: payload is {needed} bytes, quota is {quota} bytes")]
    QuotaExceeded {
        /// Size of the rejected payload in bytes.
        needed: usize,
        /// Configured quota in bytes.
        quota: usize,
    },

    /// A network fetch failed before a response was received.
    #[error("network error while fetching {url}: {source}")]
    Network {
        /// URL of the failed request.
        url: String,
        /// Underlying transport error.
        source: Box<dyn core::error::Error + Send + Sync>,
    },

    /// A manifest resource answered with a non-ok status during install.
    #[error("failed to cache {url}: server answered with status {status}")]
    Install {
        /// URL of the resource that could not be cached.
        url: String,
        /// HTTP status received.
        status: u16,
    },

    /// A URL could not be parsed or resolved against the app origin.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Convenience alias for results returned by this crate.
pub type Result<T> = core::result::Result<T, ForexError>;

/// Wraps an I/O error into a [`ForexError::Storage`].
pub(crate) fn storage_io_error(err: std::io::Error) -> ForexError {
    ForexError::Storage(Box::new(err))
}

/// Wraps a mutex poison error into a [`ForexError::Storage`].
pub(crate) fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> ForexError {
    ForexError::Storage(err.to_string().into())
}
