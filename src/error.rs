//! Crate error taxonomy (`PortalError`) with string payloads.

use thiserror::Error;

/// Error taxonomy for the portal browser, per the design's uniform raise
/// policy. Each variant carries a human-readable message.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Malformed identifier/filter input, detected eagerly before submission.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transient portal/network failures.
    #[error("external error: {0}")]
    External(String),

    /// Malformed wire payloads (GraphQL/NDJSON/metadata JSON).
    #[error("parse error: {0}")]
    Parse(String),

    /// Entity lookups that match nothing when one was required.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unexpected internal failures.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias for fallible operations in this crate.
pub type PortalResult<T> = Result<T, PortalError>;
