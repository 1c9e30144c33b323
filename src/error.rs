//! Error types for the path-tracing host.

use thiserror::Error;

/// Main error type for host operations.
///
/// Placement exhaustion is deliberately not represented here: failing to
/// place a sphere within the attempt budget yields a shorter result, not an
/// error. Callers that need an exact count check the returned length.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration rejected at validation time (never silently clamped)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kernel name could not be resolved by the backend
    #[error("kernel not found: {0}")]
    KernelNotFound(String),

    /// Shader slot name could not be resolved by the backend
    #[error("shader slot not found: {0}")]
    SlotNotFound(String),

    /// Buffer or texture creation failed; fatal for the current frame
    #[error("resource allocation failed: {0}")]
    AllocationFailed(String),

    /// Compute dispatch failed; the frame is skipped and retried next time
    #[error("backend dispatch failed: {0}")]
    DispatchFailed(String),

    /// Reading the raw frame back from the backend failed
    #[error("texture readback failed: {0}")]
    ReadbackFailed(String),
}

impl Error {
    /// Create a configuration error from a message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an allocation error from a message.
    pub fn alloc(msg: impl Into<String>) -> Self {
        Self::AllocationFailed(msg.into())
    }
}

/// Result type alias for host operations.
pub type Result<T> = std::result::Result<T, Error>;
