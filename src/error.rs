//! Error types for the memoization layer
//!
//! Provides unified error handling using thiserror.
//!
//! Failures raised by a wrapped operation are never converted into this type:
//! they come back to the caller as the operation's own error, untouched.

use thiserror::Error;

// == Memento Error Enum ==
/// Errors raised by the cache layer itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MementoError {
    /// A call argument cannot be turned into a stable signature
    #[error("Unsupported argument: {0}")]
    UnsupportedArgument(String),

    /// Cache configuration was rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, MementoError>;
