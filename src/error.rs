//! Error types for the Vault reconciliation system.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration loading, Vault API calls, the reconciliation engine itself,
//! and metrics export.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the reconciliation system.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Vault API errors.
    #[error("Vault API error: {0}")]
    Vault(#[from] VaultError),

    /// Reconciliation engine errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Metrics registration or encoding errors.
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
///
/// Every variant is fatal for the whole run: no instance-level desired state
/// can be trusted once the document fails to decode or validate.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// Two desired objects of one kind share a key on the same instance.
    #[error("Duplicate {kind} '{key}' for instance {instance}")]
    DuplicateKey {
        /// Object kind (policy, secrets engine, ...).
        kind: String,
        /// Instance address.
        instance: String,
        /// The duplicated key.
        key: String,
    },

    /// A desired object references an instance that is not configured.
    #[error("{kind} '{key}' references unknown instance {address}")]
    UnknownInstance {
        /// Object kind.
        kind: String,
        /// Key of the offending object.
        key: String,
        /// The unknown address.
        address: String,
    },
}

/// Vault API errors.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The token was rejected.
    #[error("Vault authentication failed for {address}: {message}")]
    AuthenticationFailed {
        /// Instance address.
        address: String,
        /// Description of the auth failure.
        message: String,
    },

    /// API request returned a non-success status.
    #[error("Vault request to {address} failed: {status} - {message}")]
    ApiRequestFailed {
        /// Instance address.
        address: String,
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Network error.
    #[error("Network error communicating with {address}: {message}")]
    NetworkError {
        /// Instance address.
        address: String,
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("Invalid response from {address}: {message}")]
    InvalidResponse {
        /// Instance address.
        address: String,
        /// Description of the response issue.
        message: String,
    },
}

/// Reconciliation engine errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A worker pool was requested with a size below one.
    #[error("Invalid worker pool size: {size} (must be at least 1)")]
    InvalidPoolSize {
        /// The rejected size.
        size: usize,
    },

    /// The worker pool's slots are no longer available.
    #[error("Worker pool closed while work was outstanding")]
    PoolClosed,

    /// A unit of work panicked or was aborted.
    #[error("Worker task failed: {message}")]
    WorkerPanicked {
        /// Description of the join failure.
        message: String,
    },
}

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, ConvergeError>;

impl ConvergeError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl VaultError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(address: &str, status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            address: address.to_string(),
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(address: &str, message: impl Into<String>) -> Self {
        Self::NetworkError {
            address: address.to_string(),
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(address: &str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            address: address.to_string(),
            message: message.into(),
        }
    }
}
