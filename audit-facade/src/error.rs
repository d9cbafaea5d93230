//! Error types
//!
//! Only configuration problems are allowed to escape this crate, and only at
//! startup. Everything that can go wrong while auditing a live request is
//! logged and swallowed by the middleware and the emitter.

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the audit facade
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration extraction error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// The OpenAPI specification is missing, unreadable or declares no endpoints
    ///
    /// Fatal at startup: the service must not run with an empty path table.
    #[error("{0}")]
    Configuration(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Audit envelope could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// NATS transport error
    #[error("NATS error: {0}")]
    Nats(String),
}

impl Error {
    /// Whether this error must stop the process from starting
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Configuration(_))
    }
}

// Manual From implementation for the boxed figment error
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}
