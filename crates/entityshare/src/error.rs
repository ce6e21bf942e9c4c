//! Error types for sharing sessions.

use entityshare_core::GranteeRef;
use entityshare_perms::PermsError;
use entityshare_store::StoreError;
use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum ShareError {
    /// The registry rejected the operation.
    #[error("permission error: {0}")]
    Permission(#[from] PermsError),

    /// Persisting the change failed; the session state was left unchanged.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The directory does not know this grantee.
    #[error("unknown grantee: {0}")]
    UnknownGrantee(GranteeRef),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, ShareError>;
