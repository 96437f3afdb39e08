use thiserror::Error;

/// Errors raised while configuring or connecting a store
#[derive(Error, Debug)]
pub enum CloudError {
    /// Filesystem error during bootstrap
    #[error(transparent)]
    Fs(#[from] bucketfs_core::Error),

    /// Local I/O failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unusable store URL
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    /// Configuration is missing something or failed to parse
    #[error("Configuration error: {0}")]
    Config(String),

    /// The Tokio runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result alias for this crate
pub type Result<T> = std::result::Result<T, CloudError>;
