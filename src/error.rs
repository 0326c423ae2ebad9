//! Probe error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classified failure of a probe operation.
///
/// Errors never escape the `lookup`/`trace` boundary as `Err` values; they
/// are carried inside the returned outcome so that partial results survive
/// alongside the failure that produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "details")]
pub enum ProbeError {
    /// The caller's input was rejected before any network activity.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The concurrency gate could not be acquired within its wait timeout.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The operation was rejected or interrupted by shutdown.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The underlying resolver or HTTP transport failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote peer violated protocol expectations.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The query completed but produced no records.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result alias for fallible internal steps.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;
