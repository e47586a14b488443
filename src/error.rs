/// Comprehensive error handling for the route manager
use thiserror::Error;

/// Result type for route manager operations
pub type Result<T> = std::result::Result<T, RouteError>;

/// Error taxonomy for the route manager core.
#[derive(Error, Debug)]
pub enum RouteError {
    /// `get` on an `instance_id` that does not exist.
    #[error("route not found: {0}")]
    NotFound(String),

    /// `create` with an `instance_id` that already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A CDN, IAM, ACME, or DNS-resolution call failed. Propagated as-is; the
    /// caller is expected to retry by invoking `update` again later.
    #[error("{collaborator} error: {source}")]
    Transient {
        collaborator: &'static str,
        source: String,
    },

    /// A Store write failed after a side effect against an external
    /// collaborator had already succeeded. No compensating action is taken.
    #[error("internal error: {0}")]
    Fatal(String),

    /// Certificate PEM could not be parsed, or carried no leaf certificate.
    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    /// Storage/persistence error from a `StorageBackend`.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RouteError {
    /// Create a not-found error.
    pub fn not_found<S: Into<String>>(instance_id: S) -> Self {
        RouteError::NotFound(instance_id.into())
    }

    /// Create a conflict error.
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        RouteError::Conflict(msg.into())
    }

    /// Create a transient error attributed to a named collaborator (e.g.
    /// `"cdn"`, `"iam"`, `"acme"`, `"dns"`).
    pub fn transient<S: Into<String>>(collaborator: &'static str, msg: S) -> Self {
        RouteError::Transient {
            collaborator,
            source: msg.into(),
        }
    }

    /// Create a fatal internal error.
    pub fn fatal<S: Into<String>>(msg: S) -> Self {
        RouteError::Fatal(msg.into())
    }

    /// Create a malformed-certificate error.
    pub fn malformed_certificate<S: Into<String>>(msg: S) -> Self {
        RouteError::MalformedCertificate(msg.into())
    }

    /// Create a storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        RouteError::Storage(msg.into())
    }

    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        RouteError::Configuration(msg.into())
    }

    /// Create an invalid-input error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        RouteError::InvalidInput(msg.into())
    }

    /// True if this error belongs to the recoverable "try again later" class
    /// rather than a caller-visible hard failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, RouteError::Transient { .. })
    }
}
