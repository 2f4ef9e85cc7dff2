//! Error types for the Foliant domain.
//!
//! One `thiserror` enum per bounded context, folded into a single
//! top-level `Error`. The remote taxonomy matters most: it decides what
//! the reasoning loop can recover from and what must reach the caller.

use thiserror::Error;

/// The top-level error type for all Foliant operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Remote service errors ---
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    // --- Model backend errors ---
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    // --- Conversation store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures from the remote portfolio service, classified by how the
/// caller should react to them.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Authorization was rejected even after one re-authentication attempt.
    #[error("Authorization rejected by the remote service: {0}")]
    Unauthorized(String),

    /// Connection or timeout failure that survived the internal retry budget.
    #[error("Remote call failed after {attempts} attempts: {message}")]
    Transient { attempts: u32, message: String },

    /// The remote service rejected the request as malformed (4xx).
    #[error("Remote service rejected the request (status {status}): {message}")]
    BadRequest { status: u16, message: String },

    /// Server-side failure or a payload we could not interpret.
    #[error("Unexpected upstream response: {0}")]
    Upstream(String),
}

#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("Model API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Model authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed model response: {0}")]
    Malformed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("No scripted decision left: {0}")]
    Exhausted(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Registry configuration and lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Mutating operation '{operation}' names a preview operation '{preview}' that is not registered")]
    DanglingPreview { operation: String, preview: String },

    #[error("Duplicate operation name: {0}")]
    DuplicateName(String),
}

/// Failures while executing a single operation.
#[derive(Debug, Clone, Error)]
pub enum OperationError {
    #[error("Invalid operation arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}
