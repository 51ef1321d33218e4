//! Queue errors.

use thiserror::Error;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The inbound request does not resolve to a usable target URL.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Outbound delivery failed (network error, timeout, oversized response).
    #[error("Dispatch failed: {0}")]
    DispatchFailure(String),

    /// Snapshot could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Cron expression could not be evaluated.
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },
}
